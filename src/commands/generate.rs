use std::time::Instant;

use crate::GenerateArgs;
use crate::build::{GenerateOptions, SiteGenerator};
use crate::logger::Logger;

pub async fn run(args: &GenerateArgs) -> Result<(), anyhow::Error> {
    let logger = Logger::new(args.verbose);
    let started = Instant::now();

    let generator = SiteGenerator::new(
        &args.work_dir,
        GenerateOptions {
            verbose: args.verbose,
            fresh: args.fresh,
            concurrency: args.concurrency,
        },
    )?;
    let summary = generator.build().await?;

    logger.info(format!(
        "Generated {} pages ({} skipped) in {:.1}s",
        summary.succeeded,
        summary.skipped,
        started.elapsed().as_secs_f64()
    ));
    if summary.failed > 0 {
        anyhow::bail!("{} pages failed to build", summary.failed);
    }
    logger.info(format!(
        "Run \"tablog preview {}\" to preview the site",
        args.work_dir.display()
    ));

    Ok(())
}
