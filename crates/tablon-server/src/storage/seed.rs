//! First-run seed data

use super::{MessageStore, StoreResult};
use tracing::info;

pub const SEED_USERS: [&str; 2] = ["Alice", "Bob"];
pub const SEED_MESSAGE_COUNT: usize = 50;

/// Insert the default users and messages into an empty store.
///
/// Each table is seeded only when it is empty, so running this on every
/// startup is safe.
pub async fn seed_defaults(store: &dyn MessageStore) -> StoreResult<()> {
    if store.count_users().await? == 0 {
        for name in SEED_USERS {
            store.insert_user(name).await?;
        }
        info!("Seeded {} users", SEED_USERS.len());
    }

    if store.count_messages().await? == 0 {
        for i in 0..SEED_MESSAGE_COUNT {
            let sender_id = if i % 2 == 0 { 1 } else { 2 };
            store
                .insert_message(sender_id, &format!("Este es el mensaje #{}", i + 1))
                .await?;
        }
        info!("Seeded {} messages", SEED_MESSAGE_COUNT);
    }

    Ok(())
}
