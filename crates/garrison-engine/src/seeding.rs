//! Startup seeding of AI-controlled countries.

use chrono::{DateTime, Utc};
use garrison_core::GameService;
use garrison_core::config::WorldConfig;
use garrison_db::StateStore;
use garrison_types::{ControllerKind, Personality};
use tracing::info;

/// Register the configured AI countries unless the store already holds
/// at least one. Returns how many were created.
pub async fn seed_ai_countries<S: StateStore>(
    service: &GameService<S>,
    world: &WorldConfig,
    now: DateTime<Utc>,
) -> Result<usize, garrison_core::GameError> {
    let existing = service.ai_entities().await?;
    if !existing.is_empty() {
        info!(existing = existing.len(), "AI countries already present, skipping seeding");
        return Ok(0);
    }

    let mut created: usize = 0;
    for country in &world.ai_countries {
        let personality = Personality::from_tag(&country.personality);
        service
            .register(&country.name, ControllerKind::Ai, Some(personality), now)
            .await?;
        created = created.saturating_add(1);
    }
    info!(created, "AI countries seeded");
    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use garrison_core::GameConfig;
    use garrison_core::config::AiCountryConfig;
    use garrison_db::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn seeds_once() {
        let config = GameConfig::default();
        let service = GameService::new(Arc::new(InMemoryStore::new()), &config);

        let created = seed_ai_countries(&service, &config.world, Utc::now()).await.unwrap();
        assert_eq!(created, 3);
        let again = seed_ai_countries(&service, &config.world, Utc::now()).await.unwrap();
        assert_eq!(again, 0);
        assert_eq!(service.ai_entities().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_personality_tags_become_diplomatic() {
        let config = GameConfig::default();
        let service = GameService::new(Arc::new(InMemoryStore::new()), &config);
        let world = WorldConfig {
            ai_countries: vec![AiCountryConfig {
                name: String::from("Merchant Isles"),
                personality: String::from("mercantile"),
            }],
        };

        seed_ai_countries(&service, &world, Utc::now()).await.unwrap();
        let seeded = service.ai_entities().await.unwrap();
        assert_eq!(seeded.len(), 1);
        assert_eq!(
            seeded.first().and_then(|c| c.personality),
            Some(Personality::Diplomatic)
        );
    }

    #[tokio::test]
    async fn human_players_do_not_block_seeding() {
        let config = GameConfig::default();
        let service = GameService::new(Arc::new(InMemoryStore::new()), &config);
        service
            .register("Player One", ControllerKind::User, None, Utc::now())
            .await
            .unwrap();

        let created = seed_ai_countries(&service, &config.world, Utc::now()).await.unwrap();
        assert_eq!(created, 3);
    }
}
