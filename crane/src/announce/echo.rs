//! Console announcer

use async_trait::async_trait;
use colored::Colorize;

use crate::announce::notification::Notification;
use crate::announce::{Announcer, Stage};
use crate::errors::CraneError;

/// Prints the deployment story to stdout
#[derive(Debug, Clone, Default)]
pub struct EchoAnnouncer;

#[async_trait]
impl Announcer for EchoAnnouncer {
    fn name(&self) -> &str {
        "echo"
    }

    async fn announce(&self, stage: Stage, note: &Notification) -> Result<(), CraneError> {
        match stage {
            Stage::Start => {
                println!("Alrighty, let's deploy! {}", "ᕕ( ᐛ )ᕗ".bold());
                if !note.message.is_empty() {
                    println!("{}", note.message);
                }
                println!("\n{}\n", note.changelog());
                println!("If this is not what you meant to deploy, you can cancel with the link above.");
            }
            Stage::Success => {
                println!(
                    "{}",
                    format!("…and we're done. Good job, everyone! {}", "(◕‿◕✿)".bold()).green()
                );
            }
            Stage::Failure => {
                println!("{}", format!("Deployment failed. {}", note.message).red());
            }
        }
        Ok(())
    }
}
