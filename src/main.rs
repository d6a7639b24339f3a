use reef_tracker::{app, bootstrap};

#[tokio::main]
async fn main() {
    let container = bootstrap::app::setup();

    let jobs = app::start(&container);

    for job in jobs {
        let _ = job.await;
    }
}
