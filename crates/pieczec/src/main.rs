#![forbid(unsafe_code)]

//! Pieczec CLI: XAdES-BES signing of KSeF XML documents.

use clap::{Parser, Subcommand};
use pieczec_c14n::C14nMode;
use pieczec_core::{algorithm, Error};
use pieczec_crypto::{digest, SigningKey};
use pieczec_keys::X509Certificate;
use pieczec_xades::{AuthTokenRequest, Nip, SigningRequest, SubjectIdentifierType, XadesSigner};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "PIECZEC_LOG";

#[derive(Parser)]
#[command(
    name = "pieczec",
    about = "Pieczec: XAdES-BES enveloped XML signatures for KSeF",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an XML document with an enveloped XAdES-BES signature
    Sign {
        /// Input XML file
        document: PathBuf,

        /// Private key (PEM or DER, auto-detected)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Signing certificate (PEM or DER)
        #[arg(short = 'c', long)]
        cert: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Build and sign a KSeF AuthTokenRequest
    AuthRequest {
        /// Challenge returned by the KSeF challenge endpoint
        #[arg(long)]
        challenge: String,

        /// Context NIP (10 digits)
        #[arg(long)]
        nip: String,

        /// Identify the subject by certificate fingerprint instead of subject name
        #[arg(long)]
        fingerprint: bool,

        /// Private key (PEM or DER, auto-detected)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Signing certificate (PEM or DER)
        #[arg(short = 'c', long)]
        cert: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Canonicalize an XML document
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Use Exclusive C14N instead of inclusive C14N 1.0
        #[arg(long)]
        exclusive: bool,

        /// Print the base64 SHA-256 of the canonical form instead of the form itself
        #[arg(long)]
        digest: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Sign { verbose, .. } | Commands::AuthRequest { verbose, .. } => *verbose,
        _ => false,
    };
    init_logging(verbose);

    let result = match cli.command {
        Commands::Sign {
            document,
            key,
            cert,
            output,
            verbose: _,
        } => cmd_sign(&document, &key, &cert, output),

        Commands::AuthRequest {
            challenge,
            nip,
            fingerprint,
            key,
            cert,
            output,
            verbose: _,
        } => cmd_auth_request(&challenge, &nip, fingerprint, &key, &cert, output),

        Commands::C14n {
            file,
            exclusive,
            digest,
            output,
        } => cmd_c14n(&file, exclusive, digest, output),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Log to stderr, filtered by `PIECZEC_LOG` (default `warn`, `debug` with `-v`).
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_sign(
    document: &Path,
    key: &Path,
    cert: &Path,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let xml = read_file(document)?;
    let (key, certificate) = load_credentials(key, cert)?;
    tracing::info!(document = %document.display(), "signing");

    let signed = XadesSigner::new().sign(&SigningRequest {
        document: &xml,
        certificate: &certificate,
        key: &key,
    })?;
    write_output(output, signed.as_bytes())
}

fn cmd_auth_request(
    challenge: &str,
    nip: &str,
    fingerprint: bool,
    key: &Path,
    cert: &Path,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut request = AuthTokenRequest::new(challenge, Nip::parse(nip)?);
    if fingerprint {
        request =
            request.with_subject_identifier_type(SubjectIdentifierType::CertificateFingerprint);
    }
    let (key, certificate) = load_credentials(key, cert)?;
    let signed = request.sign(&XadesSigner::new(), &certificate, &key)?;
    write_output(output, signed.as_bytes())
}

fn cmd_c14n(
    file: &Path,
    exclusive: bool,
    print_digest: bool,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let xml = read_file(file)?;
    let mode = if exclusive {
        C14nMode::Exclusive
    } else {
        C14nMode::Inclusive
    };
    let canonical = pieczec_c14n::canonicalize(&xml, mode)?;
    if print_digest {
        let mut line = digest::sha256_base64(&canonical);
        line.push('\n');
        write_output(output, line.as_bytes())
    } else {
        write_output(output, &canonical)
    }
}

fn cmd_info() -> Result<(), Error> {
    println!("Pieczec: XAdES-BES enveloped XML signatures for KSeF");
    println!();
    println!("Signature algorithms:");
    println!("  RSA PKCS#1 v1.5 with SHA-256   {}", algorithm::RSA_SHA256);
    println!("  ECDSA P-256 with SHA-256       {}", algorithm::ECDSA_SHA256);
    println!();
    println!("Digest algorithm:");
    println!("  SHA-256                        {}", algorithm::SHA256);
    println!();
    println!("Canonicalization:");
    println!("  C14N 1.0 (SignedInfo)          {}", algorithm::C14N);
    println!("  Exclusive C14N 1.0             {}", algorithm::EXC_C14N);
    println!();
    println!("Key formats:");
    println!("  PKCS#8, PKCS#1 (RSA), SEC1 (EC); PEM or DER");
    println!();
    println!("Logging:");
    println!("  {LOG_ENV}=<filter> (default: warn, -v: debug)");
    Ok(())
}

fn load_credentials(key: &Path, cert: &Path) -> Result<(SigningKey, X509Certificate), Error> {
    let key = pieczec_keys::load_signing_key_file(key).map_err(|e| {
        tracing::error!(path = %key.display(), error = %e, "failed to load signing key");
        e
    })?;
    let certificate = X509Certificate::from_file(cert).map_err(|e| {
        tracing::error!(path = %cert.display(), error = %e, "failed to load certificate");
        e
    })?;
    Ok((key, certificate))
}

fn read_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data).map_err(|e| Error::Other(format!("{}: {e}", p.display())))
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(data)
                .map_err(|e| Error::Other(format!("stdout: {e}")))
        }
    }
}
