pub mod demo_user_seed;
