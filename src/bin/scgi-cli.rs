use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use clap::Parser;

use scgi_gateway::protocol::encode_request;

#[derive(Parser)]
#[command(name = "scgi-cli")]
#[command(about = "Send one SCGI request to a gateway and print the reply", long_about = None)]
struct Cli {
    /// Gateway address
    #[arg(short, long, default_value = "127.0.0.1:4900")]
    addr: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Extra variable as NAME=VALUE, e.g. HTTP_X_TOKEN=abc
    #[arg(short = 'H', long = "var")]
    vars: Vec<String>,

    /// Seconds to wait for the reply
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,

    /// Request URI, e.g. /ping?x=1
    uri: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (path, query) = cli.uri.split_once('?').unwrap_or((cli.uri.as_str(), ""));
    let mut vars: Vec<(String, String)> = vec![
        ("SCGI".into(), "1".into()),
        ("REQUEST_METHOD".into(), cli.method.clone()),
        ("REQUEST_URI".into(), cli.uri.clone()),
        ("DOCUMENT_URI".into(), path.into()),
        ("QUERY_STRING".into(), query.into()),
    ];
    for var in &cli.vars {
        let (name, value) = var
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=VALUE, got {var:?}"))?;
        vars.push((name.into(), value.into()));
    }
    if cli.data.is_some() {
        vars.push(("CONTENT_TYPE".into(), "application/x-www-form-urlencoded".into()));
    }

    let borrowed: Vec<(&str, &str)> = vars.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
    let body = cli.data.as_deref().unwrap_or("").as_bytes();
    let wire = encode_request(&borrowed, body);

    let mut conn = TcpStream::connect(&cli.addr)?;
    conn.set_read_timeout(Some(Duration::from_secs(cli.timeout)))?;
    conn.write_all(&wire)?;

    let mut reply = Vec::new();
    conn.read_to_end(&mut reply)?;
    if reply.is_empty() {
        eprintln!("Error: gateway closed the connection without a response");
        std::process::exit(1);
    }

    std::io::stdout().write_all(&reply)?;
    Ok(())
}
