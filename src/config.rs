use crate::{Error, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "intronview")]
#[command(about = "Shortened-introns viewport driven by exon annotations")]
pub struct Config {
    /// Genome browser REST API root (e.g., https://ngb.example.com/catgenome/restapi)
    #[arg(long, env = "NGB_SERVER_URL")]
    pub server_url: Option<String>,

    /// BED file with exons, used instead of a server
    #[arg(long, env = "INTRONVIEW_BED")]
    pub bed: Option<PathBuf>,

    /// Chromosome name as it appears in the BED file
    #[arg(long, default_value = "chr1")]
    pub chromosome_name: String,

    /// Chromosome id sent with exon queries
    #[arg(long, default_value = "1")]
    pub chromosome_id: i64,

    /// Chromosome length in bases
    #[arg(long)]
    pub chromosome_size: i64,

    /// Gene track whose exons drive compression
    #[arg(long, env = "NGB_TRACK_ID", default_value = "1")]
    pub track_id: i64,

    /// Project the track belongs to
    #[arg(long, env = "NGB_PROJECT_ID")]
    pub project_id: Option<i64>,

    /// Bases of intron kept on each side of an exon
    #[arg(long, default_value = "0")]
    pub intron_length: i64,

    /// Canvas width in pixels
    #[arg(long, default_value = "1000")]
    pub canvas_width: f64,

    /// Per-request timeout for the exon service
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// How long identical exon queries are served from cache
    #[arg(long, default_value = "60")]
    pub cache_ttl_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_none() && self.bed.is_none() {
            return Err(Error::InvalidInput(
                "either --server-url or --bed is required".into(),
            ));
        }
        if self.chromosome_size < 1 {
            return Err(Error::InvalidInput(format!(
                "chromosome size must be positive, got {}",
                self.chromosome_size
            )));
        }
        if self.intron_length < 0 {
            return Err(Error::InvalidInput(format!(
                "intron length must not be negative, got {}",
                self.intron_length
            )));
        }
        if !(self.canvas_width > 0.0) {
            return Err(Error::InvalidInput(format!(
                "canvas width must be positive, got {}",
                self.canvas_width
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server_url: None,
            bed: Some(PathBuf::from("exons.bed")),
            chromosome_name: "chr1".to_string(),
            chromosome_id: 1,
            chromosome_size: 248_956_422,
            track_id: 1,
            project_id: None,
            intron_length: 0,
            canvas_width: 1000.0,
            request_timeout_secs: 30,
            cache_ttl_secs: 60,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_validate_bed_source() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_source() {
        let config = Config {
            bed: None,
            ..config()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_negative_intron_length() {
        let config = Config {
            intron_length: -5,
            ..config()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "intronview",
            "--server-url",
            "http://localhost:8080/restapi",
            "--chromosome-size",
            "5000",
            "--intron-length",
            "20",
        ])
        .unwrap();
        assert_eq!(config.chromosome_size, 5000);
        assert_eq!(config.intron_length, 20);
        assert_eq!(config.chromosome_name, "chr1");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }
}
