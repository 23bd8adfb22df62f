use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

static DATA_DIR_NAME: &str = "banter";
static BANTER_DB_NAME: &str = "banter_db.sqlite";
static CONFIG_FILE_NAME: &str = "config.json";

// For now this directory structure should be like
// data_dir_path
// |- banter
//    |- banter_db.sqlite
//    |- config.json

#[derive(Serialize, Deserialize, Debug)]
pub struct BanterConfig {
    pub database_path: PathBuf,
}

impl BanterConfig {
    /// Config rooted at the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        BanterConfig {
            database_path: data_dir.join(BANTER_DB_NAME),
        }
    }
}

/// Gets the existing config or initializes a new one if it doesn't exist
pub async fn get_or_init() -> Result<BanterConfig, Box<dyn std::error::Error>> {
    let data_dir = dirs::data_dir().ok_or("failed to find a data directory on this platform")?;

    let banter_dir = data_dir.join(DATA_DIR_NAME);
    let config_path = banter_dir.join(CONFIG_FILE_NAME);

    // Create the banter directory if it doesn't exist
    fs::create_dir_all(&banter_dir).await?;

    if config_path.exists() {
        let mut file = fs::File::open(&config_path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;

        let config: BanterConfig = serde_json::from_str(&contents)?;
        Ok(config)
    } else {
        let config = BanterConfig::new(banter_dir.clone());

        let json = serde_json::to_string_pretty(&config)?;
        let mut file = fs::File::create(&config_path).await?;
        file.write_all(json.as_bytes()).await?;

        Ok(config)
    }
}
