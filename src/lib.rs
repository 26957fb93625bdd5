pub mod cli;
pub mod conversation;
pub mod inference;
pub mod models;
pub mod render;

use cli::Args;
use conversation::ChatSession;
use inference::AryabhataClient;
use log::{ info, warn };
use models::chat::ChatMessage;
use render::SegmentKind;
use std::error::Error;
use std::fs;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{ self, AsyncBufReadExt, BufReader };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Endpoint: {}", args.base_url);
    info!("Model: {}", args.model);
    info!("Max Tokens: {}", args.max_tokens);
    info!("-------------------------");

    let client = Arc::new(AryabhataClient::from_args(&args)?);
    let mut session = ChatSession::new(client);

    if args.question.is_some() || args.image.is_some() {
        let question = args.question.clone().unwrap_or_default();
        let image = match &args.image {
            Some(path) => Some(
                fs::read(path)
                    .map_err(|e| format!("Failed to read image '{}': {}", path, e))?
            ),
            None => None,
        };
        match session.send(&question, image).await {
            Some(reply) => print_reply(reply),
            None => warn!("Nothing to send: provide a question or an image"),
        }
        return Ok(());
    }

    println!(
        "Aryabhata math chat. Type a problem, /reload to regenerate the last answer, /quit to exit."
    );
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => {}
            "/quit" | "/exit" => {
                break;
            }
            "/reload" => {
                match session.log().last_assistant_id() {
                    Some(id) => {
                        if session.reload(id).await {
                            if let Some(message) = session.log().get(id) {
                                print_reply(message);
                            }
                        } else {
                            println!("Nothing to reload.");
                        }
                    }
                    None => println!("Nothing to reload."),
                }
            }
            input => {
                if let Some(reply) = session.send(input, None).await {
                    print_reply(reply);
                }
            }
        }
    }

    Ok(())
}

/// Terminal stand-in for the display surface: inline forms flow with the
/// text, block math and code get their own indented lines.
fn print_reply(message: &ChatMessage) {
    let segments = render::parse_segments(&message.content);
    let mut out = String::new();

    for segment in &segments {
        match segment.kind {
            SegmentKind::Text | SegmentKind::InlineMath => out.push_str(&segment.value),
            SegmentKind::InlineCode => {
                out.push('`');
                out.push_str(&segment.value);
                out.push('`');
            }
            SegmentKind::BlockMath => {
                out.push_str("\n    ");
                out.push_str(segment.value.trim());
                out.push('\n');
            }
            SegmentKind::CodeBlock => {
                let language = segment.language.as_deref().unwrap_or("text");
                out.push_str(&format!("\n[{}]\n", language));
                for line in segment.value.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }

    println!("{}", out.trim_end());
}
