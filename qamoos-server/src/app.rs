use anyhow::Result;
use qamoos_core::DictConfig;

pub fn dict_app() -> Result<DictConfig> {
    let mut config = DictConfig::new();

    config.set("http.host", "127.0.0.1");
    config.set("http.port", "5000");
    config.set("media.folder", "pashto_dict");

    crate::config::config(&mut config)?;
    Ok(config)
}
