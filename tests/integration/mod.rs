mod pipeline;
mod quote_fetch;
