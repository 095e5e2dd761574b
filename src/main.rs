fn main() {
    alarm_watch::run();
}
