//! Plain-text preview on stdout.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Posting;
use crate::notify::{Destination, message};

/// Prints every posting as a preview block.
#[derive(Debug, Default)]
pub struct Console;

#[async_trait]
impl Destination for Console {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, posting: &Posting) -> Result<()> {
        println!("{}", message::console_text(posting));
        Ok(())
    }
}
