//! Sample data: three teams, a supervisor and three agents per team, and a
//! batch of leads per agent spread over the past days.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use record_store::{
    Collection, CollectionDocument, DocumentStore, FiberReady, InstallationRecord, JobStatus,
    RecordSource, Role, UserProfile,
};
use tracing::info;

use crate::error::Result;
use crate::state::AppState;

const TEAMS: [&str; 3] = ["Nairobi North", "Nairobi West", "Kiambu East"];
const STATUSES: [JobStatus; 5] = [
    JobStatus::Pending,
    JobStatus::Installed,
    JobStatus::Rejected,
    JobStatus::Lead,
    JobStatus::Forwarded,
];
const ROADS: [&str; 6] = [
    "Mombasa Rd",
    "Waiyaki Way",
    "Thika Rd",
    "Ngong Rd",
    "Argwings Kodhek",
    "Langata Rd",
];
const TITLES: [&str; 4] = ["Mr", "Mrs", "Dr", ""];
const AGENTS_PER_TEAM: usize = 3;

fn random_phone<R: Rng>(rng: &mut R) -> String {
    format!("07{}", rng.gen_range(10_000_000..100_000_000))
}

/// A point around Nairobi.
fn random_coordinates<R: Rng>(rng: &mut R) -> String {
    format!(
        "-1.{}, 36.{}",
        rng.gen_range(20_000..40_000),
        rng.gen_range(70_000..90_000)
    )
}

fn pick<'a, R: Rng>(rng: &mut R, items: &'a [&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Second word of a team name ("Nairobi North" -> "North").
fn team_short(team: &str) -> &str {
    team.split(' ').nth(1).unwrap_or(team)
}

fn seed_record<R: Rng>(rng: &mut R, agent: &UserProfile, index: usize, days: u32) -> InstallationRecord {
    let status = *STATUSES.choose(rng).unwrap_or(&JobStatus::Pending);
    let when = Utc::now() - Duration::days(i64::from(rng.gen_range(0..days.max(1))));
    let account_number = if status == JobStatus::Installed {
        format!("ACC{}", rng.gen_range(0..10_000))
    } else {
        String::new()
    };

    InstallationRecord {
        id: String::new(),
        created_by_uid: agent.uid.clone(),
        created_at: when,
        updated_at: when,
        synced: true,
        edited: false,
        source: RecordSource::Manual,
        title: pick(rng, &TITLES).to_string(),
        name: format!("Client {} {}", team_short(&agent.team), index + 1),
        contact: random_phone(rng),
        alt_contact: String::new(),
        email: format!("client{}@test.com", index),
        id_no: rng.gen_range(0..10_000_000).to_string(),
        road_name: pick(rng, &ROADS).to_string(),
        address: format!("Apt {}", rng.gen_range(0..100)),
        floor_no: rng.gen_range(0..10).to_string(),
        house: rng.gen_range(0..50).to_string(),
        fat: format!("FAT-{}", rng.gen_range(0..99)),
        coordinates: random_coordinates(rng),
        fiber_ready: if rng.gen_bool(0.5) {
            FiberReady::Yes
        } else {
            FiberReady::No
        },
        job_status: status,
        account_number,
        dsr: agent.display_name.clone(),
        dsr_contacts: agent.phone_number.clone(),
        team: agent.team.clone(),
        comment: "Auto-generated sample data for testing.".to_string(),
    }
}

/// Build every profile: one supervisor then the agents, per team.
fn seed_profiles<R: Rng>(rng: &mut R) -> Vec<UserProfile> {
    let mut profiles = Vec::new();
    for (t, team) in TEAMS.iter().enumerate() {
        profiles.push(UserProfile {
            uid: format!("seed_sup_{}", t + 1),
            display_name: format!("Supervisor {}", t + 1),
            phone_number: random_phone(rng),
            team: team.to_string(),
            email: format!("supervisor{}@fiber.test", t + 1),
            role: Role::Supervisor,
        });
        for i in 1..=AGENTS_PER_TEAM {
            profiles.push(UserProfile {
                uid: format!("seed_dsr_{}_{}", t, i),
                display_name: format!("DSR {} {}", team_short(team), i),
                phone_number: random_phone(rng),
                team: team.to_string(),
                email: format!("dsr{}_{}@fiber.test", t, i),
                role: Role::Dsr,
            });
        }
    }
    profiles
}

/// Write the sample data set. Profiles are upserted, records are added.
pub async fn seed(store: &dyn DocumentStore, per_agent: usize, days: u32) -> Result<(usize, usize)> {
    // Generated up front: the thread RNG must not be held across awaits.
    let (profiles, records) = {
        let mut rng = rand::thread_rng();
        let profiles = seed_profiles(&mut rng);
        let records: Vec<InstallationRecord> = profiles
            .iter()
            .filter(|p| !p.is_supervisor())
            .flat_map(|agent| {
                (0..per_agent)
                    .map(|k| seed_record(&mut rng, agent, k, days))
                    .collect::<Vec<_>>()
            })
            .collect();
        (profiles, records)
    };

    for profile in &profiles {
        store
            .set(Collection::Users, &profile.uid, profile.to_fields()?)
            .await?;
    }
    for record in &records {
        store
            .add(Collection::Installations, record.to_fields()?)
            .await?;
    }

    Ok((profiles.len(), records.len()))
}

pub async fn run(state: &AppState, per_agent: usize, days: u32) -> Result<()> {
    let (profiles, records) = seed(state.store.as_ref(), per_agent, days).await?;
    info!(profiles, records, "Seed complete");
    println!(
        "Created {} teams, {} profiles and {} client records.",
        TEAMS.len(),
        profiles,
        records
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_store::{fetch_typed, MemoryStore, Query};

    #[tokio::test]
    async fn test_seed_shape() {
        let store = MemoryStore::new();
        let (profiles, records) = seed(&store, 20, 30).await.unwrap();
        assert_eq!(profiles, 12);
        assert_eq!(records, 180);

        let supervisors: Vec<UserProfile> = fetch_typed(
            &store,
            &Query::new(Collection::Users).where_eq("role", "supervisor"),
        )
        .await
        .unwrap();
        assert_eq!(supervisors.len(), 3);

        let north: Vec<InstallationRecord> = fetch_typed(
            &store,
            &Query::new(Collection::Installations).where_eq("Team", "Nairobi North"),
        )
        .await
        .unwrap();
        assert_eq!(north.len(), 60);
        assert!(north.iter().all(|r| r.dsr.starts_with("DSR North")));
        assert!(north
            .iter()
            .all(|r| (r.job_status == JobStatus::Installed) != r.account_number.is_empty()));
    }
}
