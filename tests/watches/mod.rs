mod one_shot;
mod stream_adapters;
