use anyhow::Result;
use arena::{
    sim::{self, SimConfig},
    AgentConfig, RunConfig, SimSelfPlay,
};
use arena_candle_agent::{
    critic::CriticConfig,
    dqn::DqnConfig,
    sac::SacConfig,
    sac_discrete::DiscreteSacConfig,
};
use arena_core::{
    replay_buffer::ReplayBufferConfig, self_play::SelfPlayConfig, Snapshot,
};
use tempdir::TempDir;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(agent: AgentConfig) -> RunConfig {
    RunConfig::new(agent)
        .self_play(
            SelfPlayConfig::default()
                .max_ticks(12)
                .start_delay_ms(0)
                .tick_interval_ms(0)
                .train_iterations(2)
                .checkpoint_interval(2)
                .pool_size(2)
                .seed(1),
        )
        .replay_buffer(ReplayBufferConfig::default().capacity(1_000))
}

fn dqn() -> AgentConfig {
    AgentConfig::DoubleDueling(DqnConfig::default().units(vec![16]).batch_size(8))
}

fn build(config: RunConfig) -> Result<SimSelfPlay> {
    let (env, actuator) = sim::arena(SimConfig::default().sensor_dropout(0.1));
    SimSelfPlay::build(config, env, actuator)
}

#[tokio::test]
async fn test_dqn_selfplay_and_resume() -> Result<()> {
    init();
    let dir = TempDir::new("arena_selfplay")?;
    let path = dir.path().join("checkpoint.json");

    let mut sp = build(config(dqn()))?;
    sp.run_matches(Some(3)).await?;

    // Training starts before the second match.
    assert_eq!(sp.n_matches(), 3);
    assert_eq!(sp.schedule().train_steps, 4);
    assert_eq!(sp.pool().len(), 2);
    assert!(sp.buffer().len() > 8);
    sp.save_checkpoint(&path)?;

    let (env, actuator) = sim::arena(SimConfig::default());
    let mut resumed = SimSelfPlay::resume(&path, env, actuator)?;
    assert_eq!(resumed.schedule().train_steps, 4);
    assert_eq!(resumed.buffer().len(), sp.buffer().len());
    assert_eq!(resumed.buffer().priorities(), sp.buffer().priorities());
    assert_eq!(resumed.agent().export_params()?, sp.agent().export_params()?);
    assert_eq!(resumed.pool().len(), 2);
    for (a, b) in resumed.pool().iter().zip(sp.pool().iter()) {
        assert_eq!(a.export_params()?, b.export_params()?);
    }
    assert_eq!(resumed.config(), sp.config());

    resumed.run_matches(Some(1)).await?;
    assert_eq!(resumed.schedule().train_steps, 6);
    Ok(())
}

#[tokio::test]
async fn test_sac_selfplay() -> Result<()> {
    init();
    let critic = CriticConfig::default().units(vec![16]);
    let agents = [
        AgentConfig::DiscreteSac(
            DiscreteSacConfig::default()
                .actor_units(vec![16])
                .critic_config(critic.clone())
                .batch_size(8),
        ),
        AgentConfig::ContinuousSac(
            SacConfig::default()
                .actor_units(vec![16])
                .critic_config(critic)
                .batch_size(8),
        ),
    ];

    for agent in agents {
        let mut sp = build(config(agent))?;
        sp.run_matches(Some(2)).await?;
        assert_eq!(sp.schedule().train_steps, 2);
        assert_eq!(sp.pool().len(), 1);
        assert!(sp.buffer().entries().iter().all(|t| t.state.len() == 24));
    }
    Ok(())
}

#[tokio::test]
async fn test_pause_stops_after_the_match() -> Result<()> {
    init();
    let mut sp = build(config(dqn()))?;
    sp.pause_handle().pause();
    sp.run().await?;
    assert_eq!(sp.n_matches(), 1);
    assert_eq!(sp.schedule().train_steps, 0);
    Ok(())
}
