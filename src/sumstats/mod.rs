//! Quality control and harmonization of GWAS summary statistics.

pub mod hwe;
pub mod info;
pub mod munge;
pub mod qc;
pub mod record;

/// Size the global rayon thread pool if a thread count was given.
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), anyhow::Error> {
    if let Some(num_threads) = num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }
    Ok(())
}
