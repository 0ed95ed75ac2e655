pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod outline;
pub mod illustrate;
pub mod deck;
pub mod deliver;
pub mod response;
pub mod handler;

/*

deckgen turns a topic and a slide count into a .pptx deck:
one completion call for the outline, one image call per slide,
then the deck is either returned or forwarded to a webhook.

deckgen/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error taxonomy and status mapping
│   ├── config.rs       # Environment configuration, delivery mode
│   ├── request.rs      # Inbound request + provider request types
│   ├── providers/      # Provider traits and HTTP clients
│   │   ├── mod.rs
│   │   ├── openai.rs   # Completions + image generation
│   │   └── webhook.rs  # Deck forwarding
│   ├── outline.rs      # Outline prompt and blank-line splitting
│   ├── illustrate.rs   # Per-slide image fan-out
│   ├── deck/           # Deck model and .pptx writer
│   ├── deliver.rs      # Download or webhook delivery
│   ├── response.rs     # API Gateway response envelope
│   ├── handler.rs      # The pipeline
│   └── bin/
│       └── generate_deck.rs  # Lambda entry point
└── tests/              # Pipeline tests with fake providers

*/

pub use config::{DeckConfig, Delivery};
pub use error::Error;
pub use handler::{Backend, DeckHandler};
pub use request::DeckRequest;
pub use response::ApiGatewayResponse;
