//! dtrsign - sign a DTR or leave-application PDF from the command line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dtrsign_core::{DateRangeMode, Engine, EngineConfig, SignRequest, SignerRole};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dtrsign")]
#[command(version, about = "Sign a DTR or leave-application PDF")]
struct Args {
    /// Document to sign
    input: PathBuf,

    /// PKCS#12 certificate bundle
    bundle: PathBuf,

    /// Bundle password
    password: String,

    /// Stamp background image (PNG or JPEG)
    stamp_image: PathBuf,

    /// Signer role: owner, incharge, leave-owner, leave-head, leave-sao
    /// or leave-cao
    role: SignerRole,

    /// Where to write the signed document
    output: PathBuf,

    /// Place the signature boxes at the partial-range position
    #[arg(long)]
    partial_month: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dtrsign_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let document = std::fs::read(&args.input)
        .with_context(|| format!("reading document {}", args.input.display()))?;
    let bundle = std::fs::read(&args.bundle)
        .with_context(|| format!("reading certificate bundle {}", args.bundle.display()))?;
    let stamp_image = std::fs::read(&args.stamp_image)
        .with_context(|| format!("reading stamp image {}", args.stamp_image.display()))?;

    let engine = Engine::new(&EngineConfig::from_env());
    let signed = engine
        .sign(SignRequest {
            document,
            bundle,
            password: args.password,
            stamp_image,
            role: args.role,
            date_range: DateRangeMode::from_whole_month(!args.partial_month),
        })
        .await?;

    std::fs::write(&args.output, &signed)
        .with_context(|| format!("writing signed document {}", args.output.display()))?;
    info!(output = %args.output.display(), bytes = signed.len(), "document signed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_positionals_and_the_month_flag() {
        let args = Args::try_parse_from([
            "dtrsign",
            "in.pdf",
            "bundle.p12",
            "secret",
            "stamp.png",
            "incharge",
            "out.pdf",
            "--partial-month",
        ])
        .unwrap();
        assert_eq!(args.role, SignerRole::Incharge);
        assert!(args.partial_month);
        assert_eq!(args.output, PathBuf::from("out.pdf"));
    }

    #[test]
    fn defaults_to_whole_month() {
        let args = Args::try_parse_from([
            "dtrsign",
            "in.pdf",
            "bundle.p12",
            "secret",
            "stamp.png",
            "owner",
            "out.pdf",
        ])
        .unwrap();
        assert!(!args.partial_month);
    }

    #[test]
    fn rejects_an_unknown_role() {
        let result = Args::try_parse_from([
            "dtrsign",
            "in.pdf",
            "bundle.p12",
            "secret",
            "stamp.png",
            "auditor",
            "out.pdf",
        ]);
        assert!(result.is_err());
    }
}
