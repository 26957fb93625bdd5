use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base URL of the aryabhata inference endpoint.
    #[arg(
        long,
        env = "ARYABHATA_BASE_URL",
        default_value = "https://http.aryabhatta-proxy.yotta-infrastructure.on-prem.clusters.s9t.link"
    )]
    pub base_url: String,

    /// Bearer token for the inference endpoint.
    #[arg(long, env = "ARYABHATA_API_KEY", default_value = "")]
    pub api_key: String,

    /// Client identifier sent in the `id` header. A random one is generated
    /// per run when unset.
    #[arg(long, env = "ARYABHATA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Model name requested from the endpoint.
    #[arg(long, env = "ARYABHATA_MODEL", default_value = "aryabhata")]
    pub model: String,

    /// Maximum number of tokens the model may generate per reply.
    #[arg(long, env = "ARYABHATA_MAX_TOKENS", default_value = "4096")]
    pub max_tokens: u32,

    /// Ask a single question and exit instead of starting the interactive
    /// prompt.
    #[arg(long)]
    pub question: Option<String>,

    /// Path to an image of a problem to attach to the question (one-shot
    /// mode only).
    #[arg(long)]
    pub image: Option<String>,
}
