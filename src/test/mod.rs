mod queues;
mod red;
