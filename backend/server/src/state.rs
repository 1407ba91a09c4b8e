use std::sync::Arc;

use super::{
    cache::AnswerCache,
    config::Config,
    database::{MySqlExecutor, QueryExecutor},
    questions::Resolver,
};

pub struct State {
    pub config: Config,
    pub cache: AnswerCache,
    pub executor: Arc<dyn QueryExecutor>,
}

impl State {
    pub fn new(config: Config) -> Arc<Self> {
        let executor = Arc::new(MySqlExecutor::new(&config));

        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: Config, executor: Arc<dyn QueryExecutor>) -> Arc<Self> {
        Arc::new(Self {
            config,
            cache: AnswerCache::new(),
            executor,
        })
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.cache, self.executor.as_ref())
    }
}
