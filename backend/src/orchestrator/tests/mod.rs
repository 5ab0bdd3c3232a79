mod test_single_draw;
