use anyhow::Result;
use arena::{
    sim::{self, SimConfig},
    AgentConfig, RunConfig, SimSelfPlay, TensorboardRecorder,
};
use arena_core::{error::ArenaError, Agent};
use clap::Parser;
use log::info;
use std::{fs, path::PathBuf};

/// Train an agent by self-play in the toy arena
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML configuration of the run; defaults are used if omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// YAML configuration of the toy arena
    #[arg(long)]
    sim_config: Option<PathBuf>,

    /// Checkpoint document to resume from
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Directory of the checkpoint, parameters and TensorBoard logs
    #[arg(long, default_value = "model/arena")]
    model_dir: PathBuf,

    /// Stop after this number of matches instead of waiting for Ctrl-C
    #[arg(long)]
    max_matches: Option<usize>,
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Load config from {:?}", path);
            RunConfig::load(path)?
        }
        None => RunConfig::new(AgentConfig::default()),
    };

    let state_dim = config.state.state_dim();
    if config.agent.state_dim() != state_dim {
        return Err(ArenaError::DimensionMismatch {
            name: "agent.state_dim",
            expected: state_dim,
            actual: config.agent.state_dim(),
        }
        .into());
    }

    if config.self_play.checkpoint_path.is_none() {
        let path = args.model_dir.join("checkpoint.json");
        config.self_play = config.self_play.checkpoint_path(Some(path));
    }
    Ok(config)
}

fn build(args: &Args) -> Result<SimSelfPlay> {
    let sim_config = match &args.sim_config {
        Some(path) => serde_yaml::from_reader(fs::File::open(path)?)?,
        None => SimConfig::default(),
    };
    let (env, actuator) = sim::arena(sim_config);

    match &args.resume {
        Some(path) => SimSelfPlay::resume(path, env, actuator),
        None => {
            let config = load_config(args)?;
            config.save(args.model_dir.join("config.yaml"))?;
            SimSelfPlay::build(config, env, actuator)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    fs::create_dir_all(&args.model_dir)?;

    let recorder = TensorboardRecorder::new(args.model_dir.join("tensorboard"));
    let mut self_play = build(&args)?.with_recorder(Box::new(recorder));

    let pause = self_play.pause_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Pause requested, stopping at the end of the match");
            pause.pause();
        }
    });

    self_play.run_matches(args.max_matches).await?;

    let checkpoint = self_play
        .config()
        .self_play
        .checkpoint_path
        .clone()
        .unwrap_or_else(|| args.model_dir.join("checkpoint.json"));
    self_play.save_checkpoint(&checkpoint)?;
    self_play
        .agent()
        .save_params(&args.model_dir.join("params.json"))?;
    info!(
        "Saved checkpoint to {:?} after {} training steps",
        checkpoint,
        self_play.schedule().train_steps
    );

    Ok(())
}
