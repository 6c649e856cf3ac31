//! Triage agent that routes questions to specialists.
//!
//! Run a local Ollama first, then:
//!   cargo run -p herd-runtime --example handoff

use herd_runtime::Agent;

#[tokio::main]
async fn main() -> herd_core::Result<()> {
    let code_expert = Agent::builder("code_expert")
        .instructions(
            "You are a programming expert. Answer questions about languages, \
             libraries, and software design in depth.",
        )
        .build();

    let general = Agent::builder("general")
        .instructions("You answer everyday questions briefly and clearly.")
        .build();

    let triage = Agent::builder("triage")
        .instructions(
            "You are a triage agent. For programming questions use \
             route_to_code_expert; for everything else use route_to_general. \
             Return the specialist's answer to the user.",
        )
        .handoff(code_expert, "Route programming questions here")
        .handoff(general, "Route general questions here")
        .build();

    for question in [
        "What is the borrow checker in Rust?",
        "How long should I steep green tea?",
    ] {
        println!("user: {question}");
        let response = triage.chat(question).await?;
        println!("triage: {}\n", response.content);
    }

    println!("stats: {}", triage.stats().summary());
    Ok(())
}
