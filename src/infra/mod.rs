pub mod mapon;
