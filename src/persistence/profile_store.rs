use crate::mapping::{
    LoadedProfile, MappingError, Profile, RawProfileDocument, DEFAULT_PROFILE_NAME,
};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PROFILES_DIR: &str = ".config/voicepad/profiles";
const PROFILE_EXTENSION: &str = "toml";

/// Profile files in one directory, `<dir>/<name>.toml`
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `~/.config/voicepad/profiles`
    pub fn default_dir() -> PathBuf {
        let mut path = get_home_dir();
        path.push(PROFILES_DIR);
        path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all stored profiles, sorted
    pub async fn list_names(&self) -> Result<Vec<String>> {
        if !tokio::fs::try_exists(&self.dir)
            .await
            .map_err(|e| eyre!("Failed to check if profile directory exists: {}", e))?
        {
            debug!("Profile directory does not exist, no profiles available");
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| eyre!("Failed to read profile directory: {}", e))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| eyre!("Failed to read directory entry: {}", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                debug!("Found profile: {}", name);
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Loads a profile, keeping every valid mapping.
    ///
    /// Invalid mappings end up in [`LoadedProfile::rejected`]; only an
    /// unreadable file or a document without a name fails the load.
    pub async fn load(&self, name: &str) -> Result<LoadedProfile> {
        let path = self.profile_path(name)?;

        if !tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check if profile file exists: {}", e))?
        {
            return Err(eyre!("Profile does not exist: {}", name));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| eyre!("Failed to read profile file {}: {}", path.display(), e))?;
        let document: RawProfileDocument = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse profile file {}: {}", path.display(), e))?;

        if document.name != name {
            warn!(
                "Profile file {} names itself '{}', using '{}'",
                path.display(),
                document.name,
                name
            );
        }

        let mut loaded = Profile::from_raw_document(document);
        loaded.profile.name = name.to_string();
        info!(
            "Profile {} loaded: {} mappings, {} rejected",
            name,
            loaded.profile.mappings.len(),
            loaded.rejected.len()
        );
        Ok(loaded)
    }

    pub async fn save(&self, profile: &Profile) -> Result<()> {
        let path = self.profile_path(&profile.name)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| eyre!("Failed to create profile directory: {}", e))?;

        let content = toml::to_string_pretty(&profile.to_document())
            .map_err(|e| eyre!("Failed to serialize profile {}: {}", profile.name, e))?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| eyre!("Failed to write profile file: {}", e))?;

        info!("Profile {} saved successfully", profile.name);
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.profile_path(name)?;

        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| eyre!("Failed to check if profile file exists: {}", e))?
        {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| eyre!("Failed to delete profile file: {}", e))?;

            info!("Profile {} deleted successfully", name);
            Ok(())
        } else {
            Err(eyre!("Profile does not exist: {}", name))
        }
    }

    /// Writes the starter profile when no profile exists yet.
    ///
    /// Returns true when it was created.
    pub async fn ensure_default(&self) -> Result<bool> {
        if !self.list_names().await?.is_empty() {
            return Ok(false);
        }

        info!("Creating default profile in {}", self.dir.display());
        self.save(&Profile::default_profile()).await?;
        Ok(true)
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf> {
        validate_profile_name(name)?;
        let mut path = self.dir.clone();
        path.push(format!("{}.{}", name, PROFILE_EXTENSION));
        Ok(path)
    }
}

/// Rejects names that cannot be used as a file stem.
pub fn validate_profile_name(name: &str) -> Result<(), MappingError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed != name
        || name.contains(['/', '\\'])
        || name == "."
        || name == ".."
    {
        return Err(MappingError::InvalidProfileName(name.to_string()));
    }
    Ok(())
}

/// Name of the profile to start with: the requested one if stored, else
/// `default`, else the first stored name.
pub fn pick_profile<'a>(names: &'a [String], requested: Option<&str>) -> Option<&'a str> {
    if let Some(requested) = requested {
        if let Some(found) = names.iter().find(|n| n.as_str() == requested) {
            return Some(found.as_str());
        }
        warn!("Requested profile '{}' not found", requested);
    }
    names
        .iter()
        .find(|n| n.as_str() == DEFAULT_PROFILE_NAME)
        .or_else(|| names.first())
        .map(String::as_str)
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
