pub mod goods;
pub mod goods_log;
