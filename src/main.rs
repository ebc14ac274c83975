use anyhow::Result;
use clap::Parser;
use log::info;
use sqlite_layout::{
    db::{Chunk, ChunkLayout, ChunkSource},
    Cli,
};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    info!("Decoding {} page(s) of {}", cli.pages, cli.db_path.display());

    let chunks = ChunkSource::from_path(&cli.db_path)?
        .page_size(cli.page_size)
        .max_chunks(cli.pages)
        .build()?;

    for chunk in chunks {
        report(&chunk?);
    }

    Ok(())
}

fn report(chunk: &Chunk) {
    let layout = chunk.decode();
    let page_type = match &layout {
        Ok(ChunkLayout::Database(decoded)) => decoded.value.page.as_ref().ok().map(|p| p.page_type),
        Ok(ChunkLayout::Page(decoded)) => Some(decoded.value.page_type),
        Err(_) => None,
    };

    if chunk.number > 1 {
        println!();
    }
    match (chunk.number, page_type) {
        (1, Some(t)) => println!("page 1 (database header, {t})"),
        (1, None) => println!("page 1 (database header)"),
        (n, Some(t)) => println!("page {n} ({t})"),
        (n, None) => println!("page {n}"),
    }

    match layout {
        Ok(layout) => {
            for field in layout.fields() {
                println!("{field}");
            }
            for anomaly in layout.anomalies() {
                println!("warning: {anomaly}");
            }
            if let ChunkLayout::Database(decoded) = &layout {
                if let Err(e) = &decoded.value.page {
                    println!("error: page 1 header: {e}");
                }
            }
        }
        Err(e) => println!("error: {e}"),
    }
}
