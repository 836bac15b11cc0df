//! Decision loop — the complete engine lifecycle in one program.
//!
//! Shows:
//! 1. Direct decide → reward loop on a [`ContextualBandit`].
//! 2. How rewards reshape the ranking for a known context.
//! 3. Hierarchical reward shaping (strong + weak samples).
//! 4. The same bandit served over channels by a [`DecisionServer`].
//!
//! Run with:
//!   cargo run --example decision_loop

use armax::{
    strong_sample, weak_samples, ArmSet, BilinearConfig, BilinearModel, ContextualBandit,
    DecisionServer, InboundMessage, OutboundMessage, RandomContextSource, ScoringModel,
    ServerConfig,
};
use crossbeam_channel::unbounded;
use std::time::Duration;

fn print_ranking(label: &str, ranked: &[(String, f64)]) {
    println!("  {label}:");
    for (arm, score) in ranked {
        println!("    {arm:12} {score:+.4}");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // -----------------------------------------------------------------------
    // 1. Direct decide → reward loop
    // -----------------------------------------------------------------------
    println!("=== 1. Direct decide -> reward loop ===");

    let mut arms = ArmSet::new();
    arms.insert("cafe_west", vec![1.0, 0.0, 0.2]);
    arms.insert("cafe_east", vec![0.0, 1.0, 0.2]);
    arms.insert("office", vec![0.0, 0.0, 1.0]);

    let cfg = BilinearConfig {
        global_dim: 2,
        arm_dim: 3,
        learning_rate: 0.05,
        init_scale: 0.0,
        seed: 42,
    };
    let mut bandit = ContextualBandit::new(
        RandomContextSource::new(2, 7),
        arms,
        BilinearModel::new(cfg),
    )
    .unwrap();

    // A made-up "morning" situation.  Zero-initialized weights tie every arm,
    // so the first decision falls back to insertion order.
    let morning = [1.0, 0.0];
    for round in 0..5 {
        let (arm, idx) = bandit.infer_with_context(&morning).unwrap();
        // Pretend the user only ever liked the office in the morning.
        let reward = if arm == "office" { 1.0 } else { 0.0 };
        println!("  round {round}: chose {arm:?} (handle {idx}) -> reward {reward}");
        bandit.give_reward(idx, reward).unwrap();
    }

    // -----------------------------------------------------------------------
    // 2. The ranking after learning
    // -----------------------------------------------------------------------
    println!("\n=== 2. Ranking after learning ===");
    let ranked = bandit.rank_arms_with_context(&morning).unwrap();
    print_ranking("morning context", &ranked);
    println!(
        "  stats: {} update calls, {} samples, mean reward {:.3}",
        bandit.model().stats().update_calls,
        bandit.model().stats().samples_applied,
        bandit.model().stats().mean_reward()
    );

    // -----------------------------------------------------------------------
    // 3. Hierarchical shaping: credit a coarse "cafe" outcome
    // -----------------------------------------------------------------------
    println!("\n=== 3. Hierarchical reward shaping ===");

    let evening = [0.0, 1.0];
    let chosen = "cafe_east";
    let mut samples = vec![strong_sample(
        &evening,
        chosen,
        bandit.arms().get(chosen).unwrap(),
    )];
    samples.extend(weak_samples(&evening, bandit.arms(), "cafe"));
    println!(
        "  shaped {} samples for coarse key \"cafe\" (1 strong + {} weak)",
        samples.len(),
        samples.len() - 1
    );
    bandit.learn_samples(&samples).unwrap();
    let ranked = bandit.rank_arms_with_context(&evening).unwrap();
    print_ranking("evening context", &ranked);

    // -----------------------------------------------------------------------
    // 4. The same bandit behind a DecisionServer
    // -----------------------------------------------------------------------
    println!("\n=== 4. Serving over channels ===");

    let (in_tx, in_rx) = unbounded();
    let (out_tx, out_rx) = unbounded();
    let mut server = DecisionServer::new(bandit, in_rx, out_tx, ServerConfig::default());
    server.start().unwrap();

    in_tx
        .send(InboundMessage::Context {
            context: morning.to_vec(),
        })
        .unwrap();
    let reply = out_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    println!("  reply: {}", serde_json::to_string(&reply).unwrap());

    // Index-less reward: attributed to the decision just served.
    in_tx
        .send(InboundMessage::Reward {
            reward: 1.0,
            idx: None,
        })
        .unwrap();

    // An unknown message type is answered, never fatal.
    in_tx.send(InboundMessage::Unknown).unwrap();
    if let OutboundMessage::Error { detail } = out_rx.recv_timeout(Duration::from_secs(2)).unwrap()
    {
        println!("  error reply (worker still running): {detail}");
    }

    let bandit = server.stop().unwrap();
    println!(
        "  server stopped; history holds {} decisions ({} rewarded)",
        bandit.history().len(),
        bandit.history().labeled_len()
    );
}
