use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Subcommand;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use uuid::Uuid;

use innovest_api::{AccessAuthority, DealSource, Session};
use innovest_gateway::StompConnector;
use innovest_room::{AccessMachine, DealRoom, InterestDesk, inbox_for};
use innovest_types::models::{MandateInterest, Message};

use crate::config::Connection;

type Room<'a> = DealRoom<'a, Session, StompConnector>;

#[derive(Subcommand)]
pub enum Command {
    /// List the public deal listing
    Deals,

    /// Show a deal room and the next step available to you
    Room { deal: Uuid },

    /// Ask the innovator for access to a deal's data room
    RequestAccess { deal: Uuid },

    /// Sign the NDA on an approved request and open the data room
    SignNda { deal: Uuid },

    /// Request an intro to the innovator, which opens the chat
    Intro { deal: Uuid },

    /// Approve an investor's pending request on one of your deals
    Approve { deal: Uuid, investor: Uuid },

    /// Reject an investor's pending request on one of your deals
    Reject { deal: Uuid, investor: Uuid },

    /// Save a watermarked copy of a data-room document
    Download {
        deal: Uuid,
        document: Uuid,
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Chat in a deal room; lines typed on stdin are sent
    Chat {
        deal: Uuid,
        /// Talk to one participant instead of the whole deal
        #[arg(long)]
        with: Option<Uuid>,
    },

    /// List the conversations open to you
    Inbox,

    /// Investor mandates
    Mandate {
        #[command(subcommand)]
        command: MandateCommand,
    },
}

#[derive(Subcommand)]
pub enum MandateCommand {
    /// Express interest in a mandate
    Interest { mandate: Uuid },

    /// List who is interested in one of your mandates
    Interests { mandate: Uuid },

    /// Mark an interested innovator as contacted
    Contact { mandate: Uuid, interest: Uuid },

    /// Decline an interested innovator
    Reject { mandate: Uuid, interest: Uuid },
}

pub async fn run(command: Command, conn: &Connection) -> anyhow::Result<()> {
    match command {
        Command::Deals => deals(&conn.session).await,
        Command::Room { deal } => {
            let room = open_room(conn, deal).await;
            print_room(&room);
            room.close().await;
            Ok(())
        }
        Command::RequestAccess { deal } => {
            let mut room = open_room(conn, deal).await;
            let result = room.request_access().await;
            finish(room, result).await
        }
        Command::SignNda { deal } => {
            let mut room = open_room(conn, deal).await;
            let result = room.sign_nda().await;
            finish(room, result).await
        }
        Command::Intro { deal } => {
            let mut room = open_room(conn, deal).await;
            let result = room.request_intro().await;
            finish(room, result).await
        }
        Command::Approve { deal, investor } => review(&conn.session, deal, investor, true).await,
        Command::Reject { deal, investor } => review(&conn.session, deal, investor, false).await,
        Command::Download { deal, document, out } => {
            let mut room = open_room(conn, deal).await;
            let result = room.download(document).await;
            room.close().await;
            let bytes = result?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("cannot write {}", out.display()))?;
            println!("Saved {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
        Command::Chat { deal, with } => chat(conn, deal, with).await,
        Command::Inbox => inbox(&conn.session).await,
        Command::Mandate { command } => mandate(&conn.session, command).await,
    }
}

async fn open_room(conn: &Connection, deal_id: Uuid) -> Room<'_> {
    DealRoom::open(&conn.session, &conn.connector, Some(conn.session.user_id()), deal_id).await
}

/// Prints where the room ended up and releases it.
async fn finish(room: Room<'_>, result: Result<(), innovest_room::RoomError>) -> anyhow::Result<()> {
    print_room(&room);
    room.close().await;
    Ok(result?)
}

fn print_room(room: &Room<'_>) {
    match room.deal() {
        Some(deal) => {
            println!("{}  ({})", deal.title, deal.id);
            println!(
                "  {} | {:?} | target {}",
                deal.industry.as_deref().unwrap_or("-"),
                deal.status,
                deal.target_amount.map_or_else(|| "-".into(), |t| format!("{t:.0}"))
            );
            if let Some(teaser) = &deal.teaser_summary {
                println!("  {teaser}");
            }
        }
        None => println!("Deal {}", room.deal_id()),
    }
    if let Some(stage) = room.stage() {
        println!("Access: {stage}");
    }
    println!("Next step: {:?}", room.affordance());
    for doc in room.documents() {
        println!(
            "  document {}  {:?}  {}",
            doc.id,
            doc.file_type,
            doc.name.as_deref().unwrap_or("")
        );
    }
    if let Some(banner) = room.banner() {
        eprintln!("{:?}: {}", banner.kind, banner.message);
    }
}

async fn deals(session: &Session) -> anyhow::Result<()> {
    for deal in session.public_deals().await? {
        println!(
            "{}  {}  [{}]",
            deal.id,
            deal.title,
            deal.industry.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn review(session: &Session, deal_id: Uuid, investor_id: Uuid, approve: bool) -> anyhow::Result<()> {
    let request = session
        .innovator_requests(session.user_id())
        .await?
        .into_iter()
        .find(|r| r.deal_id == deal_id && r.investor_id == investor_id)
        .with_context(|| format!("no request from {investor_id} on deal {deal_id}"))?;

    let mut machine = AccessMachine::with_request(deal_id, session.user_id(), Some(request));
    let stage = if approve {
        machine.approve(session).await?
    } else {
        machine.reject(session).await?
    };
    println!("Request is now {stage}");
    Ok(())
}

enum Input {
    Line(Option<String>),
    Message(Option<Message>),
    Quit,
}

async fn chat(conn: &Connection, deal_id: Uuid, with: Option<Uuid>) -> anyhow::Result<()> {
    let viewer_id = conn.session.user_id();
    let mut room = open_room(conn, deal_id).await;
    if (room.chat().is_none() || with.is_some())
        && let Err(e) = room.chat_with(with).await
    {
        print_room(&room);
        room.close().await;
        return Err(e.into());
    }
    if let Some(chat) = room.chat() {
        for message in chat.messages() {
            print_message(message, viewer_id);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            message = room.next_message() => Input::Message(message),
            _ = tokio::signal::ctrl_c() => Input::Quit,
        };
        match input {
            Input::Line(Some(line)) => {
                if let Err(e) = room.send_message(&line).await {
                    eprintln!("Not sent: {e}");
                }
            }
            Input::Message(Some(message)) => print_message(&message, viewer_id),
            Input::Message(None) => {
                warn!(%deal_id, "Chat connection ended, reconnecting");
                if let Err(e) = room.resync_chat().await {
                    room.close().await;
                    return Err(e.into());
                }
            }
            Input::Line(None) | Input::Quit => break,
        }
    }
    room.close().await;
    Ok(())
}

fn print_message(message: &Message, viewer_id: Uuid) {
    let who = if message.sender_id == viewer_id {
        "you".to_string()
    } else {
        message.sender_id.to_string()
    };
    let to = if message.recipient_id.is_some() { " (direct)" } else { "" };
    println!("[{}] {who}{to}: {}", message.created_at.format("%H:%M"), message.content);
}

async fn inbox(session: &Session) -> anyhow::Result<()> {
    let Some(inbox) = inbox_for(session, session.role(), session.user_id()) else {
        println!("No conversations for this role");
        return Ok(());
    };
    for conversation in inbox.conversations().await? {
        println!(
            "{}  {}  with {}",
            conversation.deal_id, conversation.title, conversation.counterpart_id
        );
    }
    Ok(())
}

async fn find_interest(desk: &InterestDesk<'_, Session>, mandate_id: Uuid, interest_id: Uuid) -> anyhow::Result<MandateInterest> {
    match desk
        .list_interests(mandate_id)
        .await?
        .into_iter()
        .find(|i| i.id == interest_id)
    {
        Some(interest) => Ok(interest),
        None => bail!("no interest {interest_id} on mandate {mandate_id}"),
    }
}

async fn mandate(session: &Session, command: MandateCommand) -> anyhow::Result<()> {
    let desk = InterestDesk::new(session);
    match command {
        MandateCommand::Interest { mandate } => {
            desk.express_interest(mandate).await?;
            println!("Interest recorded");
        }
        MandateCommand::Interests { mandate } => {
            for interest in desk.list_interests(mandate).await? {
                println!(
                    "{}  {}  {}",
                    interest.id,
                    interest.innovator_name.as_deref().unwrap_or("-"),
                    interest.status.as_str()
                );
            }
        }
        MandateCommand::Contact { mandate, interest } => {
            let interest = find_interest(&desk, mandate, interest).await?;
            let updated = desk.mark_contacted(&interest).await?;
            println!("Interest is now {}", updated.status.as_str());
        }
        MandateCommand::Reject { mandate, interest } => {
            let interest = find_interest(&desk, mandate, interest).await?;
            let updated = desk.reject(&interest).await?;
            println!("Interest is now {}", updated.status.as_str());
        }
    }
    Ok(())
}
