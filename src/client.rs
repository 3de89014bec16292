use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::NgdError;
use crate::worker::Cancellation;

const CHUNK_SIZE: usize = 64 * 1024;

pub trait ArchiveClient: Send + Sync {
    fn get_text(&self, url: &str) -> Result<String, NgdError>;

    fn download(
        &self,
        url: &str,
        destination: &Path,
        cancel: &Cancellation,
    ) -> Result<(), NgdError>;
}

#[derive(Clone)]
pub struct HttpArchiveClient {
    client: Client,
}

impl HttpArchiveClient {
    pub fn new() -> Result<Self, NgdError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!(
                "ncbi-genome-download/{}",
                env!("CARGO_PKG_VERSION")
            ))
            .map_err(|err| NgdError::Http(err.to_string()))?,
        );

        // Genome files can take a long time; only bound the connect phase.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(60))
            .timeout(None)
            .build()
            .map_err(|err| NgdError::Http(err.to_string()))?;

        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Response, NgdError> {
        let response = self.client.get(url).send().map_err(map_request_error)?;
        if !response.status().is_success() {
            return Err(NgdError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn get_text(&self, url: &str) -> Result<String, NgdError> {
        self.get(url)?.text().map_err(map_request_error)
    }

    fn download(
        &self,
        url: &str,
        destination: &Path,
        cancel: &Cancellation,
    ) -> Result<(), NgdError> {
        let mut response = self.get(url)?;
        let mut file = File::create(destination).map_err(|err| {
            NgdError::Filesystem(format!("create {}: {err}", destination.display()))
        })?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                return Err(NgdError::Interrupted);
            }
            let read = response.read(&mut buffer).map_err(|err| {
                if is_connection_io_error(&err) {
                    NgdError::Connection(err.to_string())
                } else {
                    NgdError::Http(err.to_string())
                }
            })?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|err| NgdError::Filesystem(err.to_string()))?;
        }
        file.flush()
            .map_err(|err| NgdError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

pub fn convert_ftp_url(url: &str) -> String {
    match url.strip_prefix("ftp://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

fn map_request_error(err: reqwest::Error) -> NgdError {
    if err.is_connect() || err.is_timeout() {
        NgdError::Connection(err.to_string())
    } else {
        NgdError::Http(err.to_string())
    }
}

fn is_connection_io_error(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
    )
}
