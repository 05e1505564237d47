use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;

use data_layer::AbstractionLayer;
use errors::*;

const CONNECT_TIMEOUT_SECS: u64 = 30;

/// `DocumentFetcher` resolves an input locator to a readable stream of the document's bytes.
pub trait DocumentFetcher {
    fn fetch_document(&self, locator: &str) -> Result<Box<dyn Read + Send>>;
}

/// A `DocumentFetcher` which downloads `http://` and `https://` locators and reads every other
/// locator from the data abstraction layer.
pub struct LocatorFetcher {
    client: Client,
    data_abstraction_layer: Arc<dyn AbstractionLayer + Send + Sync>,
}

impl LocatorFetcher {
    /// `read_timeout` bounds the request and every read of the response body, so a server that
    /// stops sending fails the fetch instead of blocking it. `None` waits forever.
    pub fn new(
        data_abstraction_layer: Arc<dyn AbstractionLayer + Send + Sync>,
        read_timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(read_timeout)
            .build()
            .chain_err(|| "Unable to build HTTP client")?;

        Ok(LocatorFetcher {
            client,
            data_abstraction_layer,
        })
    }
}

fn is_http(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

impl DocumentFetcher for LocatorFetcher {
    fn fetch_document(&self, locator: &str) -> Result<Box<dyn Read + Send>> {
        if !is_http(locator) {
            return self.data_abstraction_layer.download_object(locator);
        }

        debug!("Fetching document over HTTP: {}", locator);
        let response = self.client
            .get(locator)
            .send()
            .chain_err(|| format!("Unable to fetch {}", locator))?
            .error_for_status()
            .chain_err(|| format!("Unable to fetch {}", locator))?;
        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;
    use data_layer::NFSAbstractionLayer;
    use super::*;

    fn read_request(stream: &TcpStream) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
    }

    // Serves a single canned response on a local port and returns its base URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&stream);
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            ).unwrap();
        });

        format!("http://{}", address)
    }

    // Promises a large body, sends a few bytes of it and then holds the connection open.
    fn serve_stalled(stall: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&stream);
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: 1000000\r\n\r\nsome words "
            ).unwrap();
            stream.flush().unwrap();
            thread::sleep(stall);
        });

        format!("http://{}", address)
    }

    fn fetcher(store: &TempDir) -> LocatorFetcher {
        let layer = Arc::new(NFSAbstractionLayer::new(store.path()));
        LocatorFetcher::new(layer, Some(Duration::from_secs(30))).unwrap()
    }

    #[test]
    fn fetches_http_documents() {
        let store = TempDir::new().unwrap();
        let url = serve_once("200 OK", "the quick brown fox");

        let mut content = String::new();
        fetcher(&store)
            .fetch_document(&format!("{}/doc.txt", url))
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        assert_eq!("the quick brown fox", content);
    }

    #[test]
    fn http_error_status_fails() {
        let store = TempDir::new().unwrap();
        let url = serve_once("404 Not Found", "missing");

        assert!(
            fetcher(&store)
                .fetch_document(&format!("{}/doc.txt", url))
                .is_err()
        );
    }

    #[test]
    fn other_locators_use_data_layer() {
        let store = TempDir::new().unwrap();
        File::create(store.path().join("doc.txt"))
            .unwrap()
            .write_all(b"stored document")
            .unwrap();

        let mut content = String::new();
        fetcher(&store)
            .fetch_document("/doc.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        assert_eq!("stored document", content);
    }

    #[test]
    fn stalled_body_times_out() {
        let store = TempDir::new().unwrap();
        let url = serve_stalled(Duration::from_secs(20));
        let layer = Arc::new(NFSAbstractionLayer::new(store.path()));
        let fetcher = LocatorFetcher::new(layer, Some(Duration::from_secs(1))).unwrap();

        let started = Instant::now();
        let mut content = Vec::new();
        let result = fetcher
            .fetch_document(&format!("{}/doc.txt", url))
            .and_then(|mut document| {
                document
                    .read_to_end(&mut content)
                    .chain_err(|| "Unable to read document")
            });

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(15));
    }
}
