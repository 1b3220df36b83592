use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use s3_files::{
    utils::init_logger, ConfigOverrides, FileSource, GetOptions, ObjectClient, PutOptions,
};

#[derive(Parser)]
#[command(name = "s3-files", version, about = "Get, save and delete files in an S3 bucket")]
struct Cli {
    /// Bucket name (defaults to S3_BUCKET)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Region (defaults to S3_REGION, then us-east-1)
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local file and print its URL
    Save {
        key: String,
        file: PathBuf,
        /// ACL to apply instead of public-read
        #[arg(long)]
        acl: Option<String>,
        /// Content-Disposition instead of inline
        #[arg(long)]
        disposition: Option<String>,
    },
    /// Download an object to a file, or stdout
    Get {
        key: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete an object
    Delete { key: String },
    /// Print the public URL for a key
    Url { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        bucket: cli.bucket,
        region: cli.region,
        ..Default::default()
    };
    let client = ObjectClient::connect(overrides)?;

    match cli.command {
        Command::Save {
            key,
            file,
            acl,
            disposition,
        } => {
            let options = PutOptions {
                acl,
                content_disposition: disposition,
                ..Default::default()
            };
            if let Some(url) = client
                .save(Some(&key), Some(FileSource::Path(file)), options)
                .await?
            {
                println!("{}", url);
            }
        }
        Command::Get { key, output } => {
            let data = client.get(&key, GetOptions::default()).await?;
            info!(
                "Fetched {} bytes ({})",
                data.content_length,
                data.content_type.as_deref().unwrap_or("unknown type")
            );
            match output {
                Some(path) => tokio::fs::write(&path, &data.body).await?,
                None => {
                    use tokio::io::AsyncWriteExt;
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data.body).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Delete { key } => {
            if let Some(output) = client.delete(Some(&key)).await? {
                println!("deleted {} ({})", output.key, output.status_code);
            }
        }
        Command::Url { key } => println!("{}", client.url_for(&key)),
    }

    Ok(())
}
