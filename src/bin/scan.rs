use std::{path::PathBuf, process::exit};

use clap::{Parser, Subcommand};

use receipt_scanner::client::{DEFAULT_SERVER_URL, ScanClient, ScanState};

/// Scan receipts and get spending insights from a receipt_scanner server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The URL of the receipt_scanner server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a receipt image and print the extracted expense record.
    Receipt {
        /// Path to a JPEG or PNG photo of the receipt.
        path: PathBuf,
    },
    /// Print a short commentary on every scanned receipt.
    Insights,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let client = ScanClient::new(&args.server_url);

    match args.command {
        Command::Receipt { path } => scan_receipt(&client, path).await,
        Command::Insights => match client.insights().await {
            Ok(insight) => println!("{insight}"),
            Err(error) => {
                print_error(format!("Erro ao gerar insight: {error}"));
                exit(1);
            }
        },
    }
}

async fn scan_receipt(client: &ScanClient, path: PathBuf) {
    let image = match std::fs::read(&path) {
        Ok(image) => image,
        Err(error) => {
            print_error(format!("Could not read {path:#?}: {error}"));
            exit(1);
        }
    };

    let state = client
        .scan(image, mime_type_for(&path), print_state)
        .await;

    if matches!(state, ScanState::Failed(_)) {
        exit(1);
    }
}

fn print_state(state: &ScanState) {
    match state {
        ScanState::Idle => println!("Nenhum cupom selecionado."),
        ScanState::Loading(step) => println!("{step}"),
        ScanState::Success(record) => {
            println!("Análise concluída!\n\n{}", record.to_pretty_json())
        }
        ScanState::Failed(error) => print_error(format!("Erro: {error}")),
    }
}

fn mime_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string())
}
