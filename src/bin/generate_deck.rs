use deckgen::{ApiGatewayResponse, DeckConfig, DeckHandler};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::info;
use serde_json::Value;

async fn handle_request(
  handler: &DeckHandler
, event: LambdaEvent<Value>
) -> Result<ApiGatewayResponse, Error>
{   info!("Function started: {}", event.context.request_id);
    Ok(handler.handle_guarded(event.payload).await)
}

#[tokio::main]
async fn main() -> Result<(), Error>
{   env_logger::init();

    let config = DeckConfig::from_env()?;
    let handler = DeckHandler::new(config);
    let handler = &handler;

    lambda_runtime::run(service_fn(
      move |event: LambdaEvent<Value>| async move {
        handle_request(handler, event).await
      }
    ))
    .await
}
