use std::cmp::Ordering;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::Card;
use crate::trello::BoardClient;

/// Pause between reposition calls to stay under the board API's rate limit.
pub const REPOSITION_DELAY: Duration = Duration::from_millis(100);

fn by_due(a: &Card, b: &Card) -> Ordering {
    match (a.due_at, b.due_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Earliest due first, undated cards last. Stable, so ties keep their order.
pub fn sort_by_due(cards: &mut [Card]) {
    cards.sort_by(by_due);
}

/// Reorders a list on the board by due date.
///
/// "Move to top" displaces whatever was there, so cards are moved from the
/// last-ranked to the first-ranked. A failed move is logged and skipped.
pub async fn sort_list_by_due_date(
    board: &dyn BoardClient,
    list_id: &str,
    delay: Duration,
) -> AppResult<usize> {
    let mut cards = board.list_cards_in_list(list_id).await?;
    if cards.len() <= 1 {
        return Ok(cards.len());
    }

    sort_by_due(&mut cards);

    for (i, card) in cards.iter().enumerate().rev() {
        if let Err(e) = board.move_card_to_top(&card.id).await {
            warn!("failed to update position for card {}: {}", card.title, e);
        }
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    info!("Sorted {} cards by due date", cards.len());
    Ok(cards.len())
}
