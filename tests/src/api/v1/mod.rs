mod builders;
mod queue;
