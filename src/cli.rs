use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    pub db_path: PathBuf,

    /// Number of page-sized chunks to decode, including the header page.
    #[arg(short = 'n', long, default_value_t = 21)]
    pub pages: usize,

    /// Chunk size in bytes. Read from the database header when omitted.
    #[arg(long)]
    pub page_size: Option<usize>,
}
