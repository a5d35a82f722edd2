use assessment_client::config::{get_config, init_config};
use assessment_client::services::navigation::{NavigationState, Viewport};
use assessment_client::services::timer::SessionTimer;
use assessment_client::SessionContext;
use tracing::info;

/// Headless session inspector: starts (or resumes) a submission against the
/// configured backend and prints what a candidate would see.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();
    info!("Using backend at {}", config.api_base_url);

    let ctx = SessionContext::new()?;

    let bootstrap = match ctx.store.submission_id() {
        Some(submission_id) => {
            info!("Resuming submission {}", submission_id);
            ctx.resume(submission_id).await?
        }
        None => {
            let assignment_id: uuid::Uuid = std::env::var("ASSIGNMENT_ID")
                .map_err(|_| anyhow::anyhow!("Set ASSIGNMENT_ID to start a new submission"))?
                .parse()?;
            info!("Starting submission for assignment {}", assignment_id);
            ctx.start(assignment_id).await?
        }
    };

    println!(
        "Assessment: {} (attempt {})",
        bootstrap.assessment.title, bootstrap.submission.attempt_number
    );

    let timer = SessionTimer::from_store(&ctx)?;
    println!(
        "Time remaining: {} minutes",
        timer.remaining().num_minutes()
    );

    let mut nav = NavigationState::new(bootstrap.test.clone(), Viewport::Desktop);
    nav.refresh_statuses(&ctx).await;

    for (si, section) in nav.sections().iter().enumerate() {
        println!(
            "[{}] {} — {} questions, {} min",
            si + 1,
            section.title,
            section.question_count(),
            section.duration_minutes
        );
        for question in &section.questions {
            println!(
                "    {:?} {:>3} marks  {:?}",
                nav.palette_state(question.id),
                question.marks,
                question.question_type
            );
        }
    }

    ctx.shutdown().await;
    Ok(())
}
