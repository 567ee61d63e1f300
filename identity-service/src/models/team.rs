//! Team model.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Team entity.
#[derive(Debug, Clone, FromRow)]
pub struct Team {
    pub team_id: Uuid,
    pub team_name: String,
    pub team_slug: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Team {
    /// Create a new team with a generated slug.
    pub fn new(team_name: String, description: Option<String>) -> Self {
        let team_slug = slugify(&team_name);
        Self {
            team_id: Uuid::new_v4(),
            team_name,
            team_slug,
            description,
            created_utc: Utc::now(),
        }
    }
}

/// Derive a URL-safe slug from a team name, with a random suffix so two
/// teams with the same name get distinct slugs.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-');
    let suffix: u32 = rand::thread_rng().gen_range(0..0xffffff);
    if slug.is_empty() {
        format!("team-{:06x}", suffix)
    } else {
        format!("{}-{:06x}", slug, suffix)
    }
}

/// Team response for API.
#[derive(Debug, Clone, Serialize)]
pub struct TeamResponse {
    pub team_id: Uuid,
    pub team_name: String,
    pub team_slug: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Team> for TeamResponse {
    fn from(t: Team) -> Self {
        Self {
            team_id: t.team_id,
            team_name: t.team_name,
            team_slug: t.team_slug,
            description: t.description,
            created_utc: t.created_utc,
        }
    }
}
