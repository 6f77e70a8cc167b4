//! Dataset loading from a remote URL, an uploaded byte stream, or the
//! built-in synthetic sales generator.

use crate::data::{parse_csv, Column, Dataset};
use crate::error::LoadError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

pub const PRODUCTS: [&str; 4] = ["Product A", "Product B", "Product C", "Product D"];
pub const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
pub const YEARS: [&str; 3] = ["2022", "2023", "2024"];
pub const SAMPLE_ROWS: usize = 200;

/// Where a dataset comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Url(String),
    Upload { name: String, bytes: Vec<u8> },
    Sample,
}

/// Source kind without its payload, as recorded in the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    Upload,
    Sample,
}

impl DataSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            DataSource::Url(_) => SourceKind::Url,
            DataSource::Upload { .. } => SourceKind::Upload,
            DataSource::Sample => SourceKind::Sample,
        }
    }

    /// URL or upload name; `None` for the sample generator
    pub fn param(&self) -> Option<String> {
        match self {
            DataSource::Url(url) => Some(url.clone()),
            DataSource::Upload { name, .. } => Some(name.clone()),
            DataSource::Sample => None,
        }
    }
}

/// HTTP GET collaborator used for URL sources
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Blocking HTTP client with a bounded timeout
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn classify(&self, err: reqwest::Error) -> LoadError {
        if err.is_timeout() {
            LoadError::Timeout(self.timeout.as_secs())
        } else {
            LoadError::Network(err.to_string())
        }
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;

        let response = client.get(url).send().map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Network(format!("HTTP {} from {}", status, url)));
        }

        let bytes = response.bytes().map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

pub struct Loader {
    fetcher: Box<dyn Fetch>,
    seed: u64,
}

impl Loader {
    pub fn new(fetcher: Box<dyn Fetch>, seed: u64) -> Self {
        Self { fetcher, seed }
    }

    pub fn with_timeout(timeout: Duration, seed: u64) -> Self {
        Self::new(Box::new(HttpFetcher::new(timeout)), seed)
    }

    pub fn load(&self, source: &DataSource) -> Result<Dataset, LoadError> {
        let dataset = match source {
            DataSource::Url(url) => {
                debug!(url = %url, "fetching CSV");
                let bytes = self.fetcher.get(url)?;
                parse_csv(&bytes)?
            }
            DataSource::Upload { name, bytes } => {
                debug!(name = %name, size = bytes.len(), "parsing uploaded CSV");
                parse_csv(bytes)?
            }
            DataSource::Sample => sample_dataset(self.seed),
        };

        info!(
            source = ?source.kind(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

/// Synthetic sales data: 200 rows cycling 4 products and 4 regions so that
/// every product and every region has exactly 50 rows. Same seed, same data.
pub fn sample_dataset(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut product = Vec::with_capacity(SAMPLE_ROWS);
    let mut region = Vec::with_capacity(SAMPLE_ROWS);
    let mut month = Vec::with_capacity(SAMPLE_ROWS);
    let mut year = Vec::with_capacity(SAMPLE_ROWS);
    let mut sales = Vec::with_capacity(SAMPLE_ROWS);
    let mut quantity = Vec::with_capacity(SAMPLE_ROWS);
    let mut revenue = Vec::with_capacity(SAMPLE_ROWS);
    let mut profit = Vec::with_capacity(SAMPLE_ROWS);

    for i in 0..SAMPLE_ROWS {
        product.push(Some(PRODUCTS[i % PRODUCTS.len()].to_string()));
        region.push(Some(REGIONS[(i / PRODUCTS.len()) % REGIONS.len()].to_string()));
        month.push(Some(rng.gen_range(1..=12).to_string()));
        year.push(Some(YEARS[rng.gen_range(0..YEARS.len())].to_string()));

        let z: f64 = rng.sample(StandardNormal);
        let s = round2((1000.0 + 200.0 * z).max(0.0));
        let r = round2(s * rng.gen_range(1.1..1.5));
        let margin: f64 = rng.gen_range(0.05..0.30);

        sales.push(Some(s));
        quantity.push(Some(rng.gen_range(10..=100) as f64));
        revenue.push(Some(r));
        profit.push(Some(round2(r * margin)));
    }

    let columns = vec![
        Column::categorical("Product", product),
        Column::categorical("Region", region),
        Column::categorical("Month", month),
        Column::categorical("Year", year),
        Column::numeric("Sales", sales),
        Column::numeric("Quantity", quantity),
        Column::numeric("Revenue", revenue),
        Column::numeric("Profit", profit),
    ];

    // Names are fixed and lengths equal, so construction cannot fail
    Dataset::new(columns).unwrap_or_default()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Instant;

    struct StaticFetcher(Result<Vec<u8>, String>);

    impl Fetch for StaticFetcher {
        fn get(&self, _url: &str) -> Result<Vec<u8>, LoadError> {
            self.0.clone().map_err(LoadError::Network)
        }
    }

    fn loader(body: Result<&str, &str>) -> Loader {
        let body = body.map(|b| b.as_bytes().to_vec()).map_err(|e| e.to_string());
        Loader::new(Box::new(StaticFetcher(body)), 42)
    }

    #[test]
    fn test_sample_shape() {
        let ds = sample_dataset(42);
        assert_eq!(ds.row_count(), SAMPLE_ROWS);
        assert_eq!(ds.column_count(), 8);
        assert!(ds.column("Sales").unwrap().is_numeric());
        assert!(!ds.column("Month").unwrap().is_numeric());

        let region = ds.column("Region").unwrap();
        let north = (0..ds.row_count()).filter(|&i| region.label(i).as_deref() == Some("North")).count();
        assert_eq!(north, 50);

        let month = ds.column("Month").unwrap();
        for i in 0..ds.row_count() {
            let m: u32 = month.label(i).unwrap().parse().unwrap();
            assert!((1..=12).contains(&m));
        }
    }

    #[test]
    fn test_sample_is_deterministic() {
        let a = sample_dataset(42).to_csv_bytes().unwrap();
        let b = sample_dataset(42).to_csv_bytes().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, sample_dataset(7).to_csv_bytes().unwrap());
    }

    #[test]
    fn test_url_source_parses_body() {
        let ds = loader(Ok("a,b\n1,2\n")).load(&DataSource::Url("http://x/data.csv".into())).unwrap();
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn test_url_network_failure() {
        let err = loader(Err("connection refused"))
            .load(&DataSource::Url("http://x".into()))
            .unwrap_err();
        assert!(err.is_network());
    }

    #[test]
    fn test_url_malformed_body() {
        let err = loader(Ok("a,b\n1\n")).load(&DataSource::Url("http://x".into())).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_upload_source() {
        let source = DataSource::Upload { name: "t.csv".into(), bytes: b"x\n1\n2\n".to_vec() };
        assert_eq!(source.param().as_deref(), Some("t.csv"));
        assert_eq!(loader(Ok("")).load(&source).unwrap().row_count(), 2);
    }

    #[test]
    fn test_http_fetcher_rejects_bad_url() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1));
        let err = fetcher.get("not a url").unwrap_err();
        assert!(err.is_network());
    }

    /// Serves one connection on a local port, handing the accepted stream to `respond`
    fn serve_once(respond: impl FnOnce(TcpStream) + Send + 'static) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                respond(stream);
            }
        });
        format!("http://{}/data.csv", addr)
    }

    #[test]
    fn test_http_fetcher_times_out() {
        let url = serve_once(|stream| {
            thread::sleep(Duration::from_secs(5));
            drop(stream);
        });
        let fetcher = HttpFetcher::new(Duration::from_secs(1));

        let started = Instant::now();
        let err = fetcher.get(&url).unwrap_err();
        assert!(matches!(err, LoadError::Timeout(1)), "got {:?}", err);
        assert!(err.is_network());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_http_fetcher_rejects_error_status() {
        let url = serve_once(|mut stream| {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        });
        let err = HttpFetcher::new(Duration::from_secs(5)).get(&url).unwrap_err();
        match err {
            LoadError::Network(msg) => assert!(msg.contains("404"), "message: {}", msg),
            other => panic!("expected a network error, got {:?}", other),
        }
    }

    #[test]
    fn test_http_fetcher_reads_body() {
        let url = serve_once(|mut stream| {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let body = "a,b\n1,2\n";
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body.as_bytes());
        });
        let bytes = HttpFetcher::new(Duration::from_secs(5)).get(&url).unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }
}
