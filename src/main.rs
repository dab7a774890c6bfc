use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use idp_connect::{
    FacebookProvider, GithubProvider, GoogleProvider, IdentityProvider, MicrosoftProvider,
    OAuthClient, OAuthError, ProviderConfig,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:8765/callback";

#[derive(Debug, Parser)]
#[command(
    name = "idp-connect",
    about = "Sign in with an identity provider and print the access token and user profile as JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Facebook(ClientArgs),
    Google {
        #[command(flatten)]
        client: ClientArgs,
        /// Ask for a refresh token.
        #[arg(long)]
        offline: bool,
        #[arg(long)]
        login_hint: Option<String>,
    },
    Github(ClientArgs),
    Microsoft(ClientArgs),
}

#[derive(Debug, Args)]
struct ClientArgs {
    #[arg(long)]
    client_id: String,
    #[arg(long)]
    client_secret: String,
    #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
    redirect_uri: String,
    /// Replaces the provider's default scopes. Repeatable.
    #[arg(long = "scope")]
    scopes: Vec<String>,
    /// e.g. socks5://127.0.0.1:1080
    #[arg(long)]
    proxy: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ClientArgs {
    fn into_config(self) -> ProviderConfig {
        let mut config = ProviderConfig::new(self.client_id, self.client_secret, self.redirect_uri);
        if !self.scopes.is_empty() {
            config = config.with_scopes(self.scopes);
        }
        if let Some(proxy) = self.proxy {
            config = config.with_proxy(proxy);
        }
        if let Some(seconds) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(seconds));
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), OAuthError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (provider, args): (Box<dyn IdentityProvider>, ClientArgs) = match cli.command {
        Command::Facebook(args) => (Box::new(FacebookProvider), args),
        Command::Google {
            client,
            offline,
            login_hint,
        } => {
            let mut provider = GoogleProvider::new();
            if offline {
                provider = provider.with_access_type("offline");
            }
            if let Some(hint) = login_hint {
                provider = provider.with_login_hint(hint);
            }
            (Box::new(provider), client)
        }
        Command::Github(args) => (Box::new(GithubProvider), args),
        Command::Microsoft(args) => (Box::new(MicrosoftProvider), args),
    };

    run(provider, args).await
}

async fn run<P: IdentityProvider>(provider: P, args: ClientArgs) -> Result<(), OAuthError> {
    let client = OAuthClient::new(provider, args.into_config())?;

    let token = client
        .run_local_flow(|redirect| {
            eprintln!("Authorization URL:\n{}", redirect.location());
            if let Err(err) = webbrowser::open(redirect.location()) {
                tracing::warn!(error = %err, "failed to open browser automatically");
            }
            Ok(())
        })
        .await?;
    tracing::info!(provider = client.provider().id(), "access token received");

    let user = client.get_user_details(&token).await?;

    let output = serde_json::json!({ "token": token, "user": user });
    let output =
        serde_json::to_string_pretty(&output).map_err(|err| OAuthError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })?;

    println!("{output}");
    Ok(())
}
