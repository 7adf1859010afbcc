// Local profile persistence: display name and the top scores, as one JSON file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const MAX_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: u32,
    // Epoch milliseconds.
    pub date: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

impl Profile {
    /// Inserts a score keeping the list sorted (score, then newest first) and capped.
    pub fn add_score(&mut self, entry: ScoreEntry) {
        self.scores.push(entry);
        self.scores
            .sort_by(|a, b| b.score.cmp(&a.score).then(b.date.cmp(&a.date)));
        self.scores.truncate(MAX_SCORES);
    }

    pub fn best(&self) -> Option<u32> {
        self.scores.first().map(|entry| entry.score)
    }
}

#[derive(Debug)]
pub enum ProfileError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Io(err) => write!(f, "profile io error: {err}"),
            ProfileError::Json(err) => write!(f, "profile is not valid json: {err}"),
        }
    }
}

impl std::error::Error for ProfileError {}

impl From<std::io::Error> for ProfileError {
    fn from(err: std::io::Error) -> Self {
        ProfileError::Io(err)
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Json(err)
    }
}

#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the profile; a missing file is an empty profile.
    pub async fn load(&self) -> Result<Profile, ProfileError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Profile::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, profile: &Profile) -> Result<(), ProfileError> {
        let bytes = serde_json::to_vec_pretty(profile)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    pub async fn record_score(&self, entry: ScoreEntry) -> Result<Profile, ProfileError> {
        let mut profile = self.load().await?;
        profile.add_score(entry);
        self.save(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: u32, date: u64) -> ScoreEntry {
        ScoreEntry {
            score,
            date,
            name: None,
        }
    }

    fn temp_store() -> ProfileStore {
        ProfileStore::new(std::env::temp_dir().join(format!(
            "versus-profile-{}.json",
            uuid::Uuid::new_v4()
        )))
    }

    #[test]
    fn when_scores_tie_then_newest_comes_first() {
        let mut profile = Profile::default();
        profile.add_score(entry(5, 100));
        profile.add_score(entry(9, 50));
        profile.add_score(entry(5, 200));

        let order: Vec<(u32, u64)> = profile.scores.iter().map(|e| (e.score, e.date)).collect();
        assert_eq!(order, vec![(9, 50), (5, 200), (5, 100)]);
    }

    #[test]
    fn when_more_than_ten_scores_then_lowest_are_dropped() {
        let mut profile = Profile::default();
        for score in 0..15 {
            profile.add_score(entry(score, u64::from(score)));
        }

        assert_eq!(profile.scores.len(), MAX_SCORES);
        assert_eq!(profile.best(), Some(14));
        assert_eq!(profile.scores.last().map(|e| e.score), Some(5));
    }

    #[tokio::test]
    async fn when_file_is_missing_then_profile_is_empty() {
        let store = temp_store();
        assert_eq!(store.load().await.expect("load"), Profile::default());
    }

    #[tokio::test]
    async fn when_score_is_recorded_then_it_persists() {
        let store = temp_store();
        store
            .save(&Profile {
                name: Some("Blue".to_string()),
                scores: Vec::new(),
            })
            .await
            .expect("save");

        store.record_score(entry(7, 1)).await.expect("record");
        let loaded = store.load().await.expect("load");

        assert_eq!(loaded.name.as_deref(), Some("Blue"));
        assert_eq!(loaded.best(), Some(7));
        let _ = std::fs::remove_file(store.path());
    }

    #[tokio::test]
    async fn when_file_is_corrupt_then_json_error_is_returned() {
        let store = temp_store();
        std::fs::write(store.path(), b"{not json").expect("write");

        let result = store.load().await;

        assert!(matches!(result, Err(ProfileError::Json(_))));
        let _ = std::fs::remove_file(store.path());
    }
}
