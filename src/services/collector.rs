use alloy::primitives::Address;
use futures::future::join_all;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use super::retry::RetryPolicy;
use crate::config::PipelineConfig;
use crate::models::{GlobalParams, PoolRecord, Valuation};
use crate::sources::{ChainReader, PriceSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to fetch global pool parameters: {0}")]
    GlobalParams(#[source] SourceError),
}

/// Results of one aggregation run, owned by the task driving it. Records
/// only grow, one batch at a time, in pool-index order.
#[derive(Debug, Default)]
pub struct AggregationSession {
    records: Vec<PoolRecord>,
    completed: u64,
    total: u64,
    dropped: Vec<u64>,
}

impl AggregationSession {
    fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn append_batch(&mut self, batch: Range<u64>, results: Vec<Option<PoolRecord>>) {
        for (pool_index, result) in batch.zip(results) {
            match result {
                Some(record) => self.records.push(record),
                None => self.dropped.push(pool_index),
            }
            self.completed += 1;
        }
    }

    pub fn records(&self) -> &[PoolRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PoolRecord> {
        self.records
    }

    /// Pool indices omitted because their identity could not be read.
    pub fn dropped(&self) -> &[u64] {
        &self.dropped
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `completed / total` in `[0, 1]`; an empty contract counts as done.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Splits `0..total` into consecutive ranges of at most `size` indices.
pub fn batches(total: u64, size: usize) -> impl Iterator<Item = Range<u64>> {
    let size = size.max(1) as u64;
    (0..total.div_ceil(size)).map(move |i| {
        let start = i * size;
        start..(start + size).min(total)
    })
}

/// Builds `PoolRecord`s for every pool of a MasterChef contract.
pub struct PoolAggregator {
    chain: Arc<dyn ChainReader>,
    prices: Arc<dyn PriceSource>,
    retry: RetryPolicy,
    batch_size: usize,
    global_timeout: Duration,
}

impl PoolAggregator {
    pub fn new(chain: Arc<dyn ChainReader>, prices: Arc<dyn PriceSource>, config: &PipelineConfig) -> Self {
        Self {
            chain,
            prices,
            retry: RetryPolicy::from(config),
            batch_size: config.batch_size.max(1),
            global_timeout: config.global_timeout(),
        }
    }

    pub async fn fetch_global_params(&self) -> Result<GlobalParams, PipelineError> {
        let chain = &self.chain;
        let reads = async {
            tokio::try_join!(
                self.retry.run("poolLength", || chain.pool_count()),
                self.retry.run("totalSpecialAllocPoint", || chain.total_allocation_weight()),
                self.retry.run("cakePerBlock(regular)", || chain.reward_rate_per_block(true)),
                self.retry.run("cakePerBlock(special)", || chain.reward_rate_per_block(false)),
            )
        };

        let (pool_count, total_allocation_weight, regular_reward_per_block, special_reward_per_block) =
            match tokio::time::timeout(self.global_timeout, reads).await {
                Ok(result) => result.map_err(PipelineError::GlobalParams)?,
                Err(_) => {
                    tracing::error!(
                        "Global parameters not read within {}ms",
                        self.global_timeout.as_millis()
                    );
                    return Err(PipelineError::GlobalParams(SourceError::Timeout));
                }
            };

        Ok(GlobalParams {
            pool_count,
            total_allocation_weight,
            regular_reward_per_block,
            special_reward_per_block,
        })
    }

    /// Runs the whole pipeline. `on_batch` observes the session after every
    /// completed batch; the next batch starts only once it returns.
    pub async fn run<F>(&self, mut on_batch: F) -> Result<AggregationSession, PipelineError>
    where
        F: FnMut(&AggregationSession),
    {
        let params = self.fetch_global_params().await?;
        tracing::info!(
            "Aggregating {} pools in batches of {}",
            params.pool_count,
            self.batch_size
        );

        let mut session = AggregationSession::new(params.pool_count);

        for batch in batches(params.pool_count, self.batch_size) {
            let results = join_all(batch.clone().map(|pid| self.fetch_pool(pid, &params))).await;

            let results = results
                .into_iter()
                .zip(batch.clone())
                .map(|(result, pid)| match result {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::error!("Skipping pool {}: {}", pid, e);
                        None
                    }
                })
                .collect();

            session.append_batch(batch.clone(), results);
            tracing::debug!(
                "Batch {}..{} done ({}/{})",
                batch.start,
                batch.end,
                session.completed(),
                session.total()
            );
            on_batch(&session);
        }

        tracing::info!(
            "✓ Aggregated {} pools ({} skipped)",
            session.records().len(),
            session.dropped().len()
        );
        Ok(session)
    }

    /// Builds the record for one pool. Only failing to read the pool's own
    /// info or LP token is an error; enrichment failures degrade fields.
    pub async fn fetch_pool(&self, pool_index: u64, params: &GlobalParams) -> Result<PoolRecord, SourceError> {
        let chain = &self.chain;
        let (info, lp_token) = tokio::try_join!(
            self.retry.run("poolInfo", || chain.pool_info(pool_index)),
            self.retry.run("lpToken", || chain.lp_token_address(pool_index)),
        )?;

        let (symbol, valuation) = match self
            .retry
            .run("token0/token1", || chain.pair_token_addresses(lp_token))
            .await
        {
            Ok((token0, token1)) if !token0.is_zero() && !token1.is_zero() => {
                self.enrich_pair(lp_token, token0, token1).await
            }
            Ok(_) => {
                tracing::debug!("Pool {} pair has a zero token address", pool_index);
                (None, None)
            }
            Err(e) => {
                tracing::warn!("Pool {} ({}) has no readable pair: {}", pool_index, lp_token, e);
                (None, None)
            }
        };

        Ok(PoolRecord::new(pool_index, &info, lp_token, symbol, valuation, params))
    }

    /// Symbol and valuation for a pair. The reads are independent and run
    /// concurrently.
    async fn enrich_pair(&self, lp_token: Address, token0: Address, token1: Address) -> (Option<String>, Option<Valuation>) {
        let chain = &self.chain;
        let retry = &self.retry;

        let (symbols, prices, reserves, supplies) = tokio::join!(
            async {
                tokio::try_join!(
                    retry.run("symbol", || chain.token_symbol(token0)),
                    retry.run("symbol", || chain.token_symbol(token1)),
                )
            },
            async { tokio::join!(self.prices.token_price(token0), self.prices.token_price(token1)) },
            async {
                tokio::try_join!(
                    retry.run("balanceOf", || chain.token_balance(token0, lp_token)),
                    retry.run("balanceOf", || chain.token_balance(token1, lp_token)),
                )
            },
            async {
                tokio::try_join!(
                    retry.run("totalSupply", || chain.token_total_supply(token0)),
                    retry.run("totalSupply", || chain.token_total_supply(token1)),
                )
            },
        );

        let symbol = match symbols {
            Ok((s0, s1)) => Some(format!("{}-{}", s0, s1)),
            Err(e) => {
                tracing::warn!("Symbols unavailable for {}: {}", lp_token, e);
                None
            }
        };

        let valuation = match (reserves, supplies) {
            (Ok(reserves), Ok(total_supplies)) => Some(Valuation {
                reserves,
                prices,
                total_supplies,
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Reserves unavailable for {}: {}", lp_token, e);
                None
            }
        };

        (symbol, valuation)
    }
}
