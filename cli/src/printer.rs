use runlens_core::interaction::InteractionEvent;
use runlens_core::RecordId;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Print coalesced interaction events as they arrive
pub fn spawn(mut events: UnboundedReceiver<InteractionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                InteractionEvent::Highlight(ids) => {
                    println!("\nhighlight {} records: {}", ids.len(), preview(&ids));
                }
                InteractionEvent::ClearHighlight => println!("\nhighlight cleared"),
                InteractionEvent::Select(ids) => {
                    println!("\nselected {} records: {}", ids.len(), preview(&ids));
                }
            }
        }
    })
}

fn preview(ids: &[RecordId]) -> String {
    const MAX_SHOWN: usize = 5;
    let shown: Vec<&str> = ids.iter().take(MAX_SHOWN).map(RecordId::as_str).collect();
    if ids.len() > MAX_SHOWN {
        format!("{}, ... (+{})", shown.join(", "), ids.len() - MAX_SHOWN)
    } else {
        shown.join(", ")
    }
}
