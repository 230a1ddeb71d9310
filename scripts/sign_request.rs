//! OAuth 1.0a Header Script
//!
//! Prints the OAuth 1.0a Authorization header for a request, signed with the
//! TWITTER_API_KEY, TWITTER_API_SECRET, TWITTER_ACCESS_TOKEN and
//! TWITTER_ACCESS_TOKEN_SECRET environment variables.
//!
//! Usage:
//!   sign_request <METHOD> <URL> [key=value ...]

use std::env;
use std::process;

use socialcheck::oauth::{sign_request, OAuth1Credentials, SignatureRequest};

fn read_var(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{} environment variable is not set", name))
}

fn run(args: &[String]) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let (method, url, rest) = match args {
        [method, url, rest @ ..] => (method, url, rest),
        _ => return Err("expected a method and a URL".into()),
    };

    let params = rest
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| format!("parameter '{}' is not in key=value form", pair))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let credentials = OAuth1Credentials {
        consumer_key: read_var("TWITTER_API_KEY")?,
        consumer_secret: read_var("TWITTER_API_SECRET")?,
        token: read_var("TWITTER_ACCESS_TOKEN")?,
        token_secret: read_var("TWITTER_ACCESS_TOKEN_SECRET")?,
    };

    let method = method.to_uppercase();
    let request = SignatureRequest {
        method: &method,
        url,
        params: &params,
    };
    Ok(sign_request(&request, &credentials)?)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(header) => println!("Authorization: {}", header),
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("Usage: sign_request <METHOD> <URL> [key=value ...]");
            process::exit(1);
        }
    }
}
