use basalt::engine::uci::Uci;

pub fn main() {
    Uci::new().run();
}
