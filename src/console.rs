//! Line-oriented operator console on top of the dashboard.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

use crate::dashboard::render::{render_draft, render_grid, render_inventory};
use crate::dashboard::{Dashboard, DashboardError, Mode, NoticeLevel, PendingDelete};
use crate::form::{DraftField, FormError, ListingDraft};

const HELP: &str = "\
Browsing:
  list                     show the inventory
  add                      open the editor for a new listing
  edit <id>                open the editor for an existing listing
  toggle <id>              mark sold / activate
  delete <id>              delete a listing (asks for confirmation)
Editing:
  show                     show the draft
  set <field> <value...>   change a field
  units <n>                set the number of rooms
  room <n>                 toggle room n between available and booked
  thumb <path>             upload the main thumbnail
  gallery <path...>        upload gallery images
  rm-image <index>         remove a gallery image
  save                     publish the listing
  cancel                   discard the draft
Anytime:
  help, quit";

enum Flow {
    Continue,
    Confirm(PendingDelete),
    Quit,
}

/// Run the console until `quit` or end of input
pub async fn run(mut dashboard: Dashboard) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Admin Panel - type `help` for commands");
    if dashboard.is_loading() {
        println!("Loading Dashboard...");
    } else {
        print!("{}", render_inventory(dashboard.listings()));
    }
    report(&mut dashboard, Ok(Flow::Continue));

    loop {
        prompt(&dashboard).await?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let result = execute(&mut dashboard, line.trim()).await;
                let flow = report(&mut dashboard, result);
                match flow {
                    Flow::Continue => {}
                    Flow::Quit => break,
                    Flow::Confirm(pending) => {
                        confirm_delete(&mut dashboard, &mut lines, pending).await?;
                    }
                }
            }
            update = dashboard.wait_for_update() => {
                update?;
                if matches!(dashboard.mode(), Mode::Browsing) {
                    println!();
                    print!("{}", render_inventory(dashboard.listings()));
                }
                report(&mut dashboard, Ok(Flow::Continue));
            }
        }
    }

    dashboard.unmount();
    Ok(())
}

async fn prompt(dashboard: &Dashboard) -> Result<()> {
    let label = match dashboard.session() {
        Some(session) => match session.listing_id() {
            Some(id) => format!("edit {}> ", id),
            None => "new> ".to_string(),
        },
        None => "admin> ".to_string(),
    };
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn execute(dashboard: &mut Dashboard, line: &str) -> Result<Flow, DashboardError> {
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(Flow::Quit),
        "list" => {
            dashboard.sync();
            print!("{}", render_inventory(dashboard.listings()));
        }
        "add" => {
            dashboard.begin_create()?;
            print_draft(dashboard)?;
        }
        "edit" => {
            dashboard.begin_edit(rest)?;
            print_draft(dashboard)?;
        }
        "toggle" => {
            let status = dashboard.toggle_status(rest).await?;
            println!("Listing {} will show as {}", rest, status);
        }
        "delete" => {
            let pending = dashboard.request_delete(rest)?;
            println!("{}", pending.prompt());
            return Ok(Flow::Confirm(pending));
        }
        "show" => print_draft(dashboard)?,
        "set" => {
            let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field: DraftField = name.parse()?;
            draft_mut(dashboard)?.set_field(field, value.trim())?;
        }
        "units" => {
            let draft = draft_mut(dashboard)?;
            draft.set_field(DraftField::TotalUnits, rest)?;
            println!("    {}", render_grid(draft.grid()));
        }
        "room" => {
            let unit = rest.parse::<u32>().map_err(|_| {
                FormError::invalid("room", format!("'{}' is not a room number", rest))
            })?;
            let draft = draft_mut(dashboard)?;
            let available = draft.toggle_unit(unit)?;
            println!(
                "Room {} is now {}",
                unit,
                if available { "available" } else { "booked" }
            );
            println!("    {}", render_grid(draft.grid()));
        }
        "thumb" => {
            dashboard.session().ok_or(DashboardError::NotEditing)?;
            let file = dashboard.read_image(rest).await?;
            dashboard.upload_thumbnail(file).await?;
        }
        "gallery" => {
            dashboard.session().ok_or(DashboardError::NotEditing)?;
            let paths: Vec<&str> = rest.split_whitespace().collect();
            let files = dashboard.read_images(&paths).await;
            dashboard.upload_gallery(files).await?;
        }
        "rm-image" => {
            let index = rest.parse::<usize>().unwrap_or(usize::MAX);
            match draft_mut(dashboard)?.remove_gallery_image(index) {
                Some(url) => println!("Removed {}", url),
                None => println!("No gallery image at {}", rest),
            }
        }
        "save" => {
            let id = dashboard.submit().await?;
            println!("✅ Published {}", id);
        }
        "cancel" => {
            if dashboard.cancel() {
                println!("Draft discarded");
            }
        }
        other => println!("Unknown command '{}'. Type `help`.", other),
    }
    Ok(Flow::Continue)
}

fn draft_mut(dashboard: &mut Dashboard) -> Result<&mut ListingDraft, DashboardError> {
    dashboard
        .session_mut()
        .map(|session| &mut session.draft)
        .ok_or(DashboardError::NotEditing)
}

fn print_draft(dashboard: &Dashboard) -> Result<(), DashboardError> {
    let session = dashboard.session().ok_or(DashboardError::NotEditing)?;
    print!("{}", render_draft(&session.draft));
    Ok(())
}

/// Print pending notices, and the error unless a notice already covered it
fn report(dashboard: &mut Dashboard, result: Result<Flow, DashboardError>) -> Flow {
    let notices = dashboard.take_notices();
    let alerted = notices.iter().any(|n| n.level == NoticeLevel::Alert);
    for notice in notices {
        match notice.level {
            NoticeLevel::Status => println!("   {}", notice.message),
            NoticeLevel::Alert => println!("🚨 {}", notice.message),
        }
    }

    match result {
        Ok(flow) => flow,
        Err(e) => {
            if !alerted {
                println!("🚨 {}", e);
            }
            Flow::Continue
        }
    }
}

async fn confirm_delete(
    dashboard: &mut Dashboard,
    lines: &mut Lines<BufReader<Stdin>>,
    pending: PendingDelete,
) -> Result<()> {
    let answer = lines.next_line().await?.unwrap_or_default();
    if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        let result = dashboard.confirm_delete(pending).await.map(|_| Flow::Continue);
        report(dashboard, result);
    } else {
        println!("Kept.");
    }
    Ok(())
}
