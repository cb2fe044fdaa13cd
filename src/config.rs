//! Configuration handling
use std::{
    fs::{create_dir_all, read_to_string, File},
    io::Write,
    path::PathBuf,
};

use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::{
    bitbucket::config::BitbucketConfig, errors::OrgMoverError, github::config::GithubConfig,
    gitlab::config::GitlabConfig, records::create_parent_dir,
};

/// Configuration data
#[derive(Deserialize, Default, Clone, Debug)]
pub struct OrgMoverConfig {
    /// path to the configuration file
    pub config_path: PathBuf,

    /// actual configuration data
    pub config_data: ConfigData,
}

/// Content of the configuration file
#[derive(Deserialize, Serialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct ConfigData {
    /// GitHub Enterprise Cloud configuration
    pub github: Option<GithubConfig>,

    /// GitHub Enterprise Server configuration
    pub ghes: Option<GithubConfig>,

    /// Gitlab configuration
    pub gitlab: Option<GitlabConfig>,

    /// Bitbucket Server configuration
    pub bitbucket: Option<BitbucketConfig>,
}

impl OrgMoverConfig {
    /// Create a new Config object from the given path or the default one
    /// # Errors
    /// Error if the config file can't be opened or parsed
    pub fn try_new(config_path: Option<PathBuf>) -> Result<Self, OrgMoverError> {
        let config_path = match config_path {
            Some(p) => p,
            None => Self::get_config_path()?,
        };
        let contents = if config_path.exists() {
            read_to_string(&config_path)
                .map_err(|e| OrgMoverError::new_with_source("Unable to open", e))?
        } else {
            String::new()
        };
        let config_data = toml::from_str(&contents)?;
        Ok(OrgMoverConfig {
            config_path,
            config_data,
        })
    }

    /// Save the config data to the config file
    /// # Errors
    /// Error if the config file can't be created or written to
    pub fn save(&self) -> Result<(), OrgMoverError> {
        let config_str = toml::to_string(&self.config_data)
            .map_err(|e| OrgMoverError::new_with_source("Unable to serialize config", e))?;
        create_parent_dir(&self.config_path)?;
        let mut file = File::create(&self.config_path)
            .map_err(|e| OrgMoverError::new_with_source("Unable to create config file", e))?;
        file.write_all(config_str.as_bytes())
            .map_err(|e| OrgMoverError::new_with_source("Unable to write to config file", e))
    }

    /// Get the path to the config file, creating it if needed
    /// # Errors
    /// Error if the home directory can't be found
    pub fn get_config_path() -> Result<PathBuf, OrgMoverError> {
        let home_dir = match home_dir() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err("Unable to get your home dir! home::home_dir() isn't working".into()),
        };
        let config_directory = home_dir.join(".config").join(".org-mover");
        let config_path = config_directory.join("config.toml");
        create_dir_all(config_directory)
            .map_err(|e| OrgMoverError::new_with_source("Unable to create config dir", e))?;
        if !config_path.exists() {
            File::create(&config_path)
                .map_err(|e| OrgMoverError::new_with_source("Unable to create config file", e))?;
        }
        Ok(config_path)
    }

    /// Update the config data and save it to the config file
    /// # Errors
    /// Error if fail to save config
    pub fn update(
        &mut self,
        updater_fn: impl FnOnce(&mut ConfigData),
    ) -> Result<(), OrgMoverError> {
        updater_fn(&mut self.config_data);
        self.save()?;
        Ok(())
    }
}
