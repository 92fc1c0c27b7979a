use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use tracing::{debug, warn};

use crate::catalog::load_catalog_or_builtin;
use crate::config::Settings;

pub mod api;
pub mod routes;

const MAX_REQUEST_BYTES: usize = 1 << 20;

pub fn run_server(settings: &Settings) -> std::io::Result<()> {
    let load = load_catalog_or_builtin(settings.catalog.as_deref());
    if let Some(notice) = &load.notice {
        warn!("{notice}");
    }
    let mut state = api::AppState::new(load.catalog, Some(settings.state_dir.join("sessions")));

    let listener = TcpListener::bind(&settings.bind)?;
    println!("upgrade ledger listening on http://{}", settings.bind);

    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                if let Err(err) = handle_connection(&mut stream, &mut state) {
                    warn!(%err, "request error");
                }
            }
            Err(err) => warn!(%err, "connection failed"),
        }
    }

    Ok(())
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Read until the headers and a `Content-Length` body are in.
fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut buffer = [0_u8; 16_384];
    loop {
        let bytes_read = stream.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..bytes_read]);

        let text = String::from_utf8_lossy(&data);
        if let Some(split) = text.find("\r\n\r\n") {
            let body_len = content_length(&text[..split]);
            if data.len() >= split + 4 + body_len {
                break;
            }
        }
        if data.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }
    Ok(data)
}

fn handle_connection(stream: &mut TcpStream, state: &mut api::AppState) -> std::io::Result<()> {
    let data = read_request(stream)?;
    if data.is_empty() {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&data);
    let mut lines = request.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut request_parts = request_line.split_whitespace();
    let method = request_parts.next().unwrap_or("GET");
    let path = request_parts.next().unwrap_or("/");

    let body = request
        .split("\r\n\r\n")
        .nth(1)
        .or_else(|| request.split("\n\n").nth(1))
        .unwrap_or("");

    let response = routes::route_request(state, method, path, body);
    debug!(%method, %path, status = response.status_code, "handled request");
    stream.write_all(response.to_http_string().as_bytes())?;
    stream.flush()?;
    Ok(())
}
