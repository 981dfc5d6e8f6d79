use clap::Parser;
use color_eyre::Result;
use gridscript::cli::Args;
use gridscript::config::{AppConfig, ConfigManager};
use gridscript::params::{SimpleImportParams, StepParams};
use gridscript::persistence::AnalysisStore;
use gridscript::steps_manager::StepsManager;
use gridscript::APP_NAME;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let config_manager = ConfigManager::new(APP_NAME)?;
    if args.init_config {
        let path = config_manager.write_default_config(false)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }
    let config = AppConfig::load_from(&config_manager)?;

    let mut manager = StepsManager::new(Vec::new(), None)?;
    manager.set_code_options(
        config.codegen.add_description_comments && !args.no_comments,
        config.codegen.optimize && !args.no_optimize,
    )?;

    let store = match &config.analyses.directory {
        Some(dir) => AnalysisStore::with_dir(dir.clone()),
        None => AnalysisStore::new(&config_manager),
    };

    if let Some(name) = &args.analysis {
        let analysis = store.load(name)?;
        analysis
            .replay_onto(&mut manager)
            .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
    }

    if !args.files.is_empty() {
        let file_names: Vec<String> = args
            .files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        let delimiters = args
            .delimiter
            .map(|d| vec![d.to_string(); file_names.len()]);
        let encodings = delimiters
            .as_ref()
            .map(|_| vec!["utf-8".to_string(); file_names.len()]);
        let params = StepParams::SimpleImport(SimpleImportParams {
            file_names,
            delimiters,
            encodings,
            skiprows: None,
        });
        manager
            .execute_new_step("cli-import", params)
            .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
    }

    if let Some(script_path) = &args.script {
        let contents = std::fs::read_to_string(script_path)?;
        let steps: Vec<StepParams> = serde_json::from_str(&contents)?;
        for (index, params) in steps.into_iter().enumerate() {
            manager
                .execute_new_step(format!("script-{}", index), params)
                .map_err(|e| color_eyre::eyre::eyre!(e.user_message()))?;
        }
    }

    if let Some(name) = &args.save_as {
        let path = store.save(&manager, name)?;
        eprintln!("Saved analysis to {}", path.display());
    }

    let script = manager.transpiled_code().to_script();
    match &args.output {
        Some(path) => std::fs::write(path, script + "\n")?,
        None => println!("{}", script),
    }

    Ok(())
}
