use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Command-line client for the chat gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Sent as X-User-Id. Omit to act anonymously.
    #[arg(long)]
    user: Option<String>,

    /// Sent as X-User-Role.
    #[arg(long)]
    role: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message
    Send {
        #[arg(long)]
        receiver: Option<String>,
        #[arg(long)]
        conversation: Option<String>,
        /// Message this one replies to
        #[arg(long)]
        parent: Option<String>,
        body: String,
    },
    /// List messages in your conversations
    Messages {
        #[arg(long)]
        conversation: Option<String>,
        #[arg(long)]
        sender: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Start a conversation with the given users
    NewConversation { participants: Vec<String> },
    /// List your conversations
    Conversations,
    /// Show a conversation as a reply tree
    Thread { id: String },
    /// Replace a message body
    Edit { id: String, body: String },
    /// Delete a message
    Delete { id: String },
    /// Show a message's edit history
    History { id: String },
    /// Mark a message as read
    Read { id: String },
    /// List unread messages
    Unread,
    /// List notifications
    Notifications,
    /// Check server status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(user) = &cli.user {
        headers.insert("x-user-id", HeaderValue::from_str(user)?);
    }
    if let Some(role) = &cli.role {
        headers.insert("x-user-role", HeaderValue::from_str(role)?);
    }

    let request = match &cli.command {
        Commands::Send {
            receiver,
            conversation,
            parent,
            body,
        } => client.post(format!("{}/api/messages", cli.url)).json(&json!({
            "receiver": receiver,
            "conversation_id": conversation,
            "parent_message": parent,
            "body": body,
        })),
        Commands::Messages {
            conversation,
            sender,
            page,
            page_size,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(conversation) = conversation {
                query.push(("conversation_id", conversation.clone()));
            }
            if let Some(sender) = sender {
                query.push(("sender", sender.clone()));
            }
            if let Some(page) = page {
                query.push(("page", page.to_string()));
            }
            if let Some(page_size) = page_size {
                query.push(("page_size", page_size.to_string()));
            }
            client.get(format!("{}/api/messages", cli.url)).query(&query)
        }
        Commands::NewConversation { participants } => client
            .post(format!("{}/api/conversations", cli.url))
            .json(&json!({ "participants": participants })),
        Commands::Conversations => client.get(format!("{}/api/conversations", cli.url)),
        Commands::Thread { id } => client.get(format!("{}/api/conversations/{}/thread", cli.url, id)),
        Commands::Edit { id, body } => client
            .put(format!("{}/api/messages/{}", cli.url, id))
            .json(&json!({ "body": body })),
        Commands::Delete { id } => client.delete(format!("{}/api/messages/{}", cli.url, id)),
        Commands::History { id } => client.get(format!("{}/api/messages/{}/history", cli.url, id)),
        Commands::Read { id } => client.put(format!("{}/api/messages/{}/read", cli.url, id)),
        Commands::Unread => client.get(format!("{}/api/messages/unread", cli.url)),
        Commands::Notifications => client.get(format!("{}/api/notifications", cli.url)),
        Commands::Status => client.get(format!("{}/status", cli.url)),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await?;

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("{}", status);
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
