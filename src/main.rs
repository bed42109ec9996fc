use anyhow::{Context, anyhow};
use clap::Parser;
use serde_json::json;
use storefront_cart::{
    AppState, configure_tracing, construct_app_state,
    domain::cart::{ProductId, UserId},
    infra::{CartCommand, Cli, get_config_settings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = get_config_settings().context("Could not read application configuration.")?;

    // _worker_guard is pulled back into the scope of main() to ensure all tracing events get
    // written to the log file when the program terminates, which is done when _worker_guard is
    // dropped.
    let _worker_guard = configure_tracing(&settings);

    let user = cli
        .user
        .map(UserId::try_from)
        .transpose()
        .context("User ids must be v7 UUIDs.")?;

    let state = construct_app_state(settings, cli.offline).await?;
    let outcome = run(&state, user, cli.command).await;
    let closed = state.close().await;

    let output = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    closed
}

async fn run(
    state: &AppState,
    user: Option<UserId>,
    command: CartCommand,
) -> anyhow::Result<serde_json::Value> {
    let api = &state.api;
    let merged_on_sign_in = api.set_auth(user).await?;
    api.load_cart().await;

    let result = match command {
        CartCommand::Show => json!(api.snapshot()),
        CartCommand::Add {
            product_id,
            quantity,
        } => {
            let product_id = ProductId::new(product_id);
            let product = state
                .catalog
                .product_by_id(&product_id)
                .await?
                .ok_or_else(|| anyhow!("Product {product_id} is not in the catalog."))?;
            json!(api.add_to_cart(&product, quantity).await?)
        }
        CartCommand::Update {
            product_id,
            quantity,
        } => json!(api.update_quantity(&ProductId::new(product_id), quantity).await?),
        CartCommand::Remove { product_id } => {
            json!(api.remove_from_cart(&ProductId::new(product_id)).await?)
        }
        CartCommand::Clear => json!(api.clear_cart().await?),
        CartCommand::Validate => {
            let report = api.validate_cart().await?;
            json!({ "message": report.message(), "report": report })
        }
        CartCommand::Merge => json!(api.merge_guest_cart().await?),
    };

    Ok(match merged_on_sign_in {
        Some(report) if !report.is_empty() => json!({ "signInMerge": report, "result": result }),
        _ => result,
    })
}
